//! MPEG-TS error types.

use thiserror::Error;

/// Errors raised while walking transport stream structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TsError {
    /// A TS packet did not begin with the 0x47 sync byte.
    #[error("invalid sync byte: expected 0x47, got 0x{0:02X}")]
    InvalidSyncByte(u8),

    /// A PSI section was shorter than its fixed header.
    #[error("PSI section too short: {0} bytes")]
    SectionTooShort(usize),

    /// A PSI section length field pointed outside the payload.
    #[error("PSI section length out of bounds")]
    SectionOutOfBounds,
}

/// Result type for MPEG-TS operations.
pub type Result<T> = std::result::Result<T, TsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TsError::InvalidSyncByte(0xFF).to_string(),
            "invalid sync byte: expected 0x47, got 0xFF"
        );
    }
}
