use std::fmt;

/// Errors a live session can surface to the user.
///
/// Every variant carries a message that is shown verbatim on the status
/// line; none of them crash the process.
#[derive(Debug)]
pub enum SessionError {
    /// Microphone access was denied or no input device exists.
    /// Recoverable by fixing permissions and retrying.
    Permission(String),

    /// Transport-level failure on the duplex connection.
    /// Stops the session; recoverable by an explicit restart.
    Connection(String),

    /// A single inbound audio fragment could not be decoded.
    /// Fatal to that fragment only, never to the session.
    Decode(String),

    /// `start()` was called while a session is already running.
    /// The active session is left untouched.
    AlreadyActive,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Permission(msg) => write!(f, "Microphone unavailable: {}", msg),
            SessionError::Connection(msg) => write!(f, "Connection error: {}", msg),
            SessionError::Decode(msg) => write!(f, "Audio decode error: {}", msg),
            SessionError::AlreadyActive => write!(f, "session already active"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SessionError::Connection(err.to_string())
    }
}

impl From<base64::DecodeError> for SessionError {
    fn from(err: base64::DecodeError) -> Self {
        SessionError::Decode(format!("invalid base64 payload: {}", err))
    }
}

/// Shorthand for results carrying a [`SessionError`].
pub type SessionResult<T> = Result<T, SessionError>;
