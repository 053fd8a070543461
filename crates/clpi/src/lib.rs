//! Clip-information (CLPI) file parser and the Entry Point Map index.
//!
//! Every transport-stream clip on a disc ships with a clip-info file
//! describing its time bases, elementary streams, and a two-level
//! sparse index (the Entry Point Map) that converts between 45 kHz
//! presentation timestamps and 192-byte source-packet offsets without
//! scanning the stream.

pub mod epmap;
pub mod error;
pub mod parse;
pub mod stream;
pub mod types;

pub use epmap::{AccessPoint, EpCoarse, EpFine, EpMap, join_packet, join_timestamp};
pub use error::ClpiError;
pub use parse::{CLPI_MAGIC, CLPI_VERSIONS, parse_clip};
pub use stream::{
    AudioFormat, AudioRate, CodingType, ColorSpace, DynamicRange, FrameRate, StreamAttr,
    VideoFormat,
};
pub use types::{AtcSequence, ClipRecord, Program, ProgramStream, StcSequence};

/// Result type for clip-info operations.
pub type Result<T> = std::result::Result<T, ClpiError>;

/// Presentation time ticks per second.
pub const TICKS_PER_SECOND: u64 = 45_000;
