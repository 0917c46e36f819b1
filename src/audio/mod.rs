pub mod capture;
pub mod device;
pub mod mic;
pub mod pcm;
pub mod playback;

pub use capture::{CaptureBackend, CaptureConfig, CaptureFrame};
pub use device::DeviceSink;
pub use mic::MicrophoneBackend;
pub use playback::{BufferId, PlaybackScheduler, PlaybackSink, ScheduledBuffer};
