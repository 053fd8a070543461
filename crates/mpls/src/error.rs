use thiserror::Error;

/// Errors that can occur while parsing a playlist file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MplsError {
    #[error(transparent)]
    Bits(#[from] bits::BitsError),

    #[error(transparent)]
    Stream(#[from] clpi::ClpiError),
}
