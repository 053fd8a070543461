//! Disc-level navigation on top of the `clpi` and `mpls` parsers.
//!
//! A [`Disc`] wraps a [`ByteSource`] (a mounted BDMV tree, or anything else
//! that can hand out playlist and clip bytes), caches parsed clip records,
//! and assembles playlists into seekable [`Title`]s.

pub mod cache;
pub mod disc;
pub mod error;
pub mod source;
pub mod title;
pub mod titlelist;

pub use cache::ClipCache;
pub use disc::Disc;
pub use error::{NavError, Result};
pub use source::{
    ByteSource, DirSource, PropertyStore, SeekRead, BACKUP_CLIPINF_DIR, BACKUP_PLAYLIST_DIR,
    CLIPINF_DIR, KNOWN_GOOD_PLAYLISTS, PLAYLIST_DIR,
};
pub use title::{NavClip, NavMark, NavPoint, Title, MAX_ANGLES};
pub use titlelist::{TitleInfo, TitleListOptions};
