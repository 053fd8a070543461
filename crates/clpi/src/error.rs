use thiserror::Error;

/// Errors that can occur while parsing or querying a clip-info file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClpiError {
    #[error(transparent)]
    Bits(#[from] bits::BitsError),

    #[error("no entry point map for PID {pid}")]
    UnresolvedReference { pid: u16 },
}
