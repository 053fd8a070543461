use thiserror::Error;

/// Errors surfaced by disc-level navigation.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("playlist {playlist_id} could not be opened as a title")]
    NoTitle { playlist_id: String },

    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clip parse error: {0}")]
    Clip(#[from] clpi::ClpiError),

    #[error("playlist parse error: {0}")]
    Playlist(#[from] mpls::MplsError),
}

pub type Result<T> = std::result::Result<T, NavError>;
