use crate::{BitReader, BitsError, Result};

/// The `{4-byte magic, 4-byte version}` header opening every structured
/// disc file.
///
/// A wrong magic rejects the file outright; a magic match with an
/// unknown version is reported separately so callers can tell "not this
/// kind of file" from "a future revision of this kind of file".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: [u8; 4],
}

impl FileHeader {
    /// Validates the first 8 bytes of `reader` against the expected
    /// magic and a whitelist of version tags.
    pub fn read(
        reader: &mut BitReader,
        magic: &[u8; 4],
        versions: &[&[u8; 4]],
    ) -> Result<FileHeader> {
        let found_magic: [u8; 4] = read_tag(reader)?;
        if &found_magic != magic {
            return Err(BitsError::MagicMismatch {
                expected: *magic,
                found: found_magic,
            });
        }

        let found_version: [u8; 4] = read_tag(reader)?;
        if !versions.iter().any(|v| **v == found_version) {
            return Err(BitsError::UnsupportedVersion {
                found: found_version,
            });
        }

        Ok(FileHeader {
            magic: found_magic,
            version: found_version,
        })
    }
}

fn read_tag(reader: &mut BitReader) -> Result<[u8; 4]> {
    let raw = reader.read_bytes(4)?;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&raw);
    Ok(tag)
}
