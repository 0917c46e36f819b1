use tokio::sync::mpsc;

use crate::error::SessionResult;

/// A block of float samples from the capture device.
///
/// Frames are transient: each one is encoded to the wire format and
/// discarded immediately after send.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Raw audio samples in [-1.0, 1.0], mono
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl CaptureFrame {
    /// Duration of this frame in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate the device is asked to capture at
    pub sample_rate: u32,
    /// Frame size in milliseconds (affects send cadence)
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: super::pcm::CAPTURE_SAMPLE_RATE, // 16kHz mono, endpoint contract
            frame_duration_ms: 100,
        }
    }
}

impl CaptureConfig {
    /// Samples per frame at the configured rate.
    pub fn frame_len(&self) -> usize {
        (self.sample_rate as u64 * self.frame_duration_ms / 1000) as usize
    }
}

/// Microphone capture backend.
///
/// Implementations deliver a continuous stream of fixed-size float frames
/// at a regular cadence. The real backend wraps the OS audio stack; tests
/// substitute a channel-fed mock.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive capture frames.
    /// Fails with `SessionError::Permission` when microphone access is
    /// denied or no input device exists.
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<CaptureFrame>>;

    /// Stop capturing and release the device handle. Must be safe to call
    /// more than once.
    async fn stop(&mut self) -> SessionResult<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}
