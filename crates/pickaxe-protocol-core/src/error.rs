use crate::codec::CodecError;
use thiserror::Error;

/// Errors surfaced by translators and the pipeline.
///
/// Cancelling a packet is not an error; see [`crate::Outcome::Cancelled`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A translator's static tables are incomplete or contradictory.
    /// Raised while building the translator, never while transforming.
    #[error("Configuration error in {translator}: {message}")]
    Configuration {
        translator: &'static str,
        message: String,
    },
    /// Packet data did not have the shape a handler expected. The read
    /// position is unreliable after this; the connection must be closed.
    #[error("Protocol violation: {0}")]
    Violation(String),
    /// API misuse, e.g. appending to a pipeline that was never initialized.
    #[error("Precondition violated: {0}")]
    Precondition(&'static str),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ProtocolError {
    pub fn configuration(translator: &'static str, message: impl Into<String>) -> Self {
        ProtocolError::Configuration {
            translator,
            message: message.into(),
        }
    }

    pub fn violation(message: impl Into<String>) -> Self {
        ProtocolError::Violation(message.into())
    }

    /// Whether the host must tear the connection down.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, ProtocolError::Violation(_) | ProtocolError::Codec(_))
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
