// PCM wire codec for the live endpoint.
//
// Outbound: f32 samples in [-1.0, 1.0] scaled by 32768 to i16, packed
// little-endian, base64-encoded, tagged audio/pcm;rate=16000.
// Inbound: base64 bytes reinterpreted as i16 LE, divided by 32768.0,
// mono at 24000 Hz. Both directions must stay bit-compatible with the
// remote endpoint.

use base64::Engine;

use crate::error::SessionError;

/// Sample rate of microphone frames sent upstream.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of audio fragments received from the endpoint.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// MIME tag attached to every outbound audio chunk.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Convert float samples to signed 16-bit little-endian bytes.
pub fn samples_to_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }
    bytes
}

/// Encode float samples to the base64 payload sent on the wire.
pub fn encode_base64(samples: &[f32]) -> String {
    base64::engine::general_purpose::STANDARD.encode(samples_to_bytes(samples))
}

/// Reinterpret signed 16-bit little-endian bytes as float samples.
pub fn bytes_to_samples(bytes: &[u8]) -> Result<Vec<f32>, SessionError> {
    if bytes.len() % 2 != 0 {
        return Err(SessionError::Decode(format!(
            "PCM payload has odd length ({} bytes)",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(samples)
}

/// Decode a base64 wire payload into float samples.
pub fn decode_base64(payload: &str) -> Result<Vec<f32>, SessionError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
    bytes_to_samples(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_little_endian() {
        // 0.5 * 32768 = 16384 = 0x4000 -> bytes [0x00, 0x40]
        let bytes = samples_to_bytes(&[0.5]);
        assert_eq!(bytes, vec![0x00, 0x40]);
    }

    #[test]
    fn test_full_scale_clamps() {
        let bytes = samples_to_bytes(&[1.0, -1.0]);
        let max = i16::from_le_bytes([bytes[0], bytes[1]]);
        let min = i16::from_le_bytes([bytes[2], bytes[3]]);
        assert_eq!(max, i16::MAX);
        assert_eq!(min, i16::MIN);
    }

    #[test]
    fn test_odd_length_payload_rejected() {
        let err = bytes_to_samples(&[0x00, 0x40, 0x7f]).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }
}
