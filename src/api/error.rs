//! Error types.
//!
//! Only recoverable conditions are represented here. Contract violations
//! panic through [`contract_violation`](crate::diagnostics::contract_violation).

/// Bootstrap failures. Fatal to the owning framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// `startup` ran twice without a `shutdown` in between.
    AlreadyStarted,
    /// An environment variable held a value that does not parse.
    InvalidConfig {
        key: &'static str,
        value: String,
    },
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::AlreadyStarted => write!(f, "call graph already started"),
            InitError::InvalidConfig { key, value } => {
                write!(f, "invalid value {:?} for {}", value, key)
            }
        }
    }
}

impl std::error::Error for InitError {}

/// A frame could not be allocated. No partial frame exists afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The configured live-frame limit is exhausted.
    LimitReached { live: usize, limit: usize },
    /// The system allocator returned null.
    OutOfMemory { size: usize },
}

impl std::fmt::Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocError::LimitReached { live, limit } => {
                write!(f, "frame limit reached ({} of {} live)", live, limit)
            }
            AllocError::OutOfMemory { size } => {
                write!(f, "out of memory allocating a {} byte frame", size)
            }
        }
    }
}

impl std::error::Error for AllocError {}
