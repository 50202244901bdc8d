use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unknown label: {0}")]
    UnknownLabel(String),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the connection can continue after skipping the offending frame.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::UnknownLabel(_) | Self::Malformed(_))
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
