//! Error handling for the thermal guard crate.

/// A specialized `Result` type for thermal guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

/// The main error type for thermal guard operations.
///
/// Every variant except [`GuardError::WebServer`] and
/// [`GuardError::ChannelClosed`] is recoverable: the component that observes
/// it logs and carries on with its previous good state.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Persisted configuration is missing, corrupt or mistyped
    #[error("Configuration error: {0}")]
    Config(String),

    /// The sensor provider failed during a poll cycle
    #[error("Sensor read error: {0}")]
    SensorRead(String),

    /// A user-entered value could not be parsed or is out of range
    #[error("Invalid timer input: {0}")]
    TimerInput(String),

    /// The operating system shutdown action failed
    #[error("Shutdown action failed: {0}")]
    ShutdownAction(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// The controller task is no longer running
    #[error("Control loop is not running")]
    ChannelClosed,
}

impl GuardError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new sensor read error
    pub fn sensor_error(msg: impl Into<String>) -> Self {
        Self::SensorRead(msg.into())
    }

    /// Create a new timer input error
    pub fn timer_input_error(msg: impl Into<String>) -> Self {
        Self::TimerInput(msg.into())
    }

    /// Create a new shutdown action error
    pub fn shutdown_error(msg: impl Into<String>) -> Self {
        Self::ShutdownAction(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether this error came from rejected user input.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::TimerInput(_))
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for GuardError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for GuardError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}
