/// Result alias that carries the custom [`BeatlaneError`] type.
pub type Result<T> = std::result::Result<T, BeatlaneError>;

/// Common error type for the core crate.
///
/// Gameplay conditions (a press with nothing to hit, a press outside the hit
/// window, an unknown lane) are never reported through this type. Only
/// precondition failures and contract violations are.
#[derive(Debug, thiserror::Error)]
pub enum BeatlaneError {
    /// The sample buffer handed to chart generation is unusable.
    #[error("invalid audio: {0}")]
    InvalidAudio(&'static str),
    /// The playback clock was driven in an order its contract forbids.
    #[error("playback clock misuse: {0}")]
    Clock(#[from] ClockError),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// The WAV decoder rejected the input stream.
    #[error("wav decode failed: {0}")]
    Wav(#[from] hound::Error),
}

impl BeatlaneError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Returns `true` when the error is a programming-contract violation
    /// rather than a user-facing failure.
    pub fn is_logic_error(&self) -> bool {
        matches!(self, Self::Clock(_))
    }
}

impl From<&str> for BeatlaneError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BeatlaneError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Contract violations of [`crate::PlaybackClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("resume called on a clock that was never started")]
    NeverStarted,
    #[error("resume called while the clock is already running")]
    AlreadyRunning,
    #[error("pause called while the clock is not running")]
    NotRunning,
    #[error("clock has already been stopped")]
    AlreadyStopped,
}
