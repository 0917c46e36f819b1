pub mod audio;
pub mod config;
pub mod error;
pub mod live;
pub mod session;

pub use audio::{
    CaptureBackend, CaptureConfig, CaptureFrame, DeviceSink, MicrophoneBackend, PlaybackScheduler,
    PlaybackSink, ScheduledBuffer,
};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use live::{LiveConnection, LiveEndpoint, ServerEvent, SessionSetup, WsLiveEndpoint};
pub use session::{LiveSession, SessionConfig, SessionState, Speaker, TranscriptEntry};
