#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Rejected by node: {0}")]
    Rejected(String),
    #[error("Failed to decode: {0}")]
    Decode(String),
    #[error("Invalid endpoint {0}")]
    InvalidEndpoint(String),
}

impl ChainError {
    /// True when the node answered but refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ChainError::Rejected(_))
    }
}
