use thiserror::Error;

/// Errors raised while reading the raw bit/byte layout of a disc file.
///
/// Any of these aborts parsing of the file at hand; callers decide
/// whether to retry the backup copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitsError {
    #[error("truncated file: needed {needed} more bits, {available} available")]
    Truncated { needed: u64, available: u64 },

    #[error("seek to byte {offset} out of range (file is {len} bytes)")]
    SeekOutOfRange { offset: u64, len: u64 },

    #[error("magic mismatch: expected {expected:?}, found {found:?}")]
    MagicMismatch { expected: [u8; 4], found: [u8; 4] },

    #[error("unsupported version tag {found:?}")]
    UnsupportedVersion { found: [u8; 4] },

    #[error("declared block at {start}+{len} exceeds file of {available} bytes")]
    InvalidLength {
        start: u64,
        len: u64,
        available: u64,
    },
}
