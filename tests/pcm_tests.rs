// Unit tests for the PCM wire codec.
//
// The encoding must stay bit-compatible with the remote endpoint:
// f32 * 32768 -> i16 little-endian -> base64 outbound, and the inverse
// (divide by 32768.0) inbound.

use voicebridge::audio::pcm;

#[test]
fn test_round_trip_within_one_quantization_step() {
    let encoded = pcm::encode_base64(&[0.5]);
    let decoded = pcm::decode_base64(&encoded).unwrap();

    assert_eq!(decoded.len(), 1);
    assert!(
        (decoded[0] - 0.5).abs() <= 1.0 / 32768.0,
        "expected 0.5 within one quantization step, got {}",
        decoded[0]
    );
}

#[test]
fn test_round_trip_many_values() {
    let samples: Vec<f32> = (-10..=10).map(|i| i as f32 / 10.0).collect();
    let encoded = pcm::encode_base64(&samples);
    let decoded = pcm::decode_base64(&encoded).unwrap();

    assert_eq!(decoded.len(), samples.len());
    for (original, restored) in samples.iter().zip(decoded.iter()) {
        assert!(
            (original - restored).abs() <= 1.0 / 32768.0,
            "sample {} came back as {}",
            original,
            restored
        );
    }
}

#[test]
fn test_silence_encodes_to_zero_bytes() {
    let bytes = pcm::samples_to_bytes(&[0.0, 0.0]);
    assert_eq!(bytes, vec![0, 0, 0, 0]);
}

#[test]
fn test_positive_full_scale_does_not_wrap() {
    // 1.0 * 32768 overflows i16; it must clamp, not wrap to -32768.
    let decoded = pcm::bytes_to_samples(&pcm::samples_to_bytes(&[1.0])).unwrap();
    assert!(decoded[0] > 0.99);
}

#[test]
fn test_negative_full_scale() {
    let decoded = pcm::bytes_to_samples(&pcm::samples_to_bytes(&[-1.0])).unwrap();
    assert!((decoded[0] + 1.0).abs() < 1e-6);
}

#[test]
fn test_decode_rejects_odd_length() {
    assert!(pcm::bytes_to_samples(&[1, 2, 3]).is_err());
}

#[test]
fn test_decode_rejects_invalid_base64() {
    assert!(pcm::decode_base64("not base64!!!").is_err());
}

#[test]
fn test_mime_type_matches_capture_rate() {
    assert_eq!(pcm::CAPTURE_MIME_TYPE, "audio/pcm;rate=16000");
    assert_eq!(pcm::CAPTURE_SAMPLE_RATE, 16000);
    assert_eq!(pcm::PLAYBACK_SAMPLE_RATE, 24000);
}
