use thiserror::Error;

/// Result type for speaker operations
pub type Result<T> = std::result::Result<T, KefError>;

/// Errors that can occur when interacting with KEF speakers
#[derive(Error, Debug)]
pub enum KefError {
    /// TCP session could not be established or was lost mid-exchange
    #[error("connection error: {message}")]
    Connection {
        /// What went wrong at the session level
        message: String,
        /// Underlying I/O cause, when there is one
        #[source]
        source: Option<std::io::Error>,
    },

    /// Received bytes could not be parsed into a frame matching the request
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A SET exchange completed but the speaker did not acknowledge it
    #[error("command failed: {0}")]
    Command(String),
}

impl KefError {
    pub(crate) fn connection(message: impl Into<String>) -> Self {
        KefError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn connection_io(message: impl Into<String>, source: std::io::Error) -> Self {
        KefError::Connection {
            message: message.into(),
            source: Some(source),
        }
    }
}
