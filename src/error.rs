use thiserror::Error;

// Unified error type for schur-sweep

#[derive(Error, Debug)]
pub enum SchurError {
    #[error("transport failure talking to rank {neighbor}: {reason}")]
    Transport { neighbor: usize, reason: String },
    #[error("malformed packet from rank {neighbor}: {reason}")]
    Packet { neighbor: usize, reason: String },
    #[error("boundary vector length mismatch: expected {expected}, got {actual}")]
    VectorSize { expected: usize, actual: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("mesh error: {0}")]
    Mesh(String),
    #[error("solve error: {0}")]
    SolveError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SchurError {
    /// Faults raised by the message-passing layer. These are never retried.
    pub fn is_transport(&self) -> bool {
        matches!(self, SchurError::Transport { .. } | SchurError::Packet { .. })
    }
}
