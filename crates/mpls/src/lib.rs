//! Movie-playlist (MPLS) file parser.
//!
//! A playlist sequences clips into a presentation: ordered play items
//! (each referencing a clip per angle and an in/out time range),
//! optional sub-paths for alternate content, and play-marks that become
//! chapters. Stream attribute records share their coding-type dispatch
//! with the clip-info crate.

pub mod error;
pub mod parse;
pub mod types;

pub use error::MplsError;
pub use parse::{MPLS_MAGIC, MPLS_VERSIONS, parse_playlist};
pub use types::{
    AngleClip, ConnectionCondition, MarkKind, PlayItem, PlayMark, PlaybackType, PlaylistRecord,
    StnStream, StreamEntry, StreamTable, SubPath, SubPlayItem, VideoQuality,
};

/// Result type for playlist parsing.
pub type Result<T> = std::result::Result<T, MplsError>;
