//! Error types for low-level bitstream parsing.

use thiserror::Error;

/// Errors raised by the bitstream readers and scanners.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Ran off the end of the bitstream.
    #[error("unexpected end of bitstream")]
    UnexpectedEnd,

    /// Exp-Golomb prefix longer than 31 zero bits.
    #[error("Exp-Golomb value too large")]
    ExpGolombOverflow,

    /// Structurally invalid data.
    #[error("invalid bitstream: {0}")]
    InvalidData(String),
}

impl CoreError {
    /// Create an invalid-data error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidData(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
