//! Bit-level plumbing shared by the BDMV file parsers.
//!
//! Every structured file on a disc opens with a 4-byte magic tag and a
//! 4-byte version tag, stores multi-byte integers big-endian, and packs
//! many fields at sub-byte granularity. This crate provides the
//! [`BitReader`] those parsers are written against, the common
//! [`FileHeader`] validation, and the generic extension-data table
//! walker shared by clip-info and playlist files.

pub mod error;
pub mod ext;
pub mod header;
pub mod reader;

pub use error::BitsError;
pub use ext::{ExtDataEntry, read_ext_data};
pub use header::FileHeader;
pub use reader::BitReader;

/// Result type for bit-level read operations.
pub type Result<T> = std::result::Result<T, BitsError>;
