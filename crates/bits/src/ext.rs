use bytes::Bytes;

use crate::{BitReader, Result};

/// One raw extension-data block.
///
/// Clip-info and playlist files share the same extension-data table
/// layout: a directory of `(id1, id2, start, length)` tuples pointing at
/// opaque payloads. The walker stays format-agnostic; each parser maps
/// the `(id1, id2)` pairs it knows and skips the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtDataEntry {
    pub id1: u16,
    pub id2: u16,
    pub data: Bytes,
}

/// Walks the extension-data table at absolute offset `ext_start`.
///
/// An `ext_start` of 0 means the file declares no extension data.
/// Payload slices are zero-copy views into the file buffer. A tuple
/// whose declared range falls outside the buffer fails with
/// `InvalidLength`; the caller treats that as a structural error for
/// the whole file.
pub fn read_ext_data(reader: &mut BitReader, ext_start: u64) -> Result<Vec<ExtDataEntry>> {
    if ext_start == 0 {
        return Ok(Vec::new());
    }

    reader.seek(ext_start)?;
    let length = reader.read_u32()?;
    if length == 0 {
        return Ok(Vec::new());
    }

    let _data_block_start = reader.read_u32()?;
    reader.skip_bytes(3)?;
    let entry_count = reader.read_u8()?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let id1 = reader.read_u16()?;
        let id2 = reader.read_u16()?;
        let start = reader.read_u32()? as u64;
        let len = reader.read_u32()? as u64;
        let data = reader.slice_at(ext_start + start, len)?;
        entries.push(ExtDataEntry { id1, id2, data });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use crate::BitsError;

    use super::*;

    const EXT_START: u64 = 8;

    /// Builds a file image with `EXT_START` bytes of padding, then the
    /// directory, then the payload bytes. Entry starts are relative to
    /// the table, as on disc.
    fn file_with_table(entries: &[(u16, u16, u32, u32)], payload: &[u8]) -> Bytes {
        let mut buf = vec![0u8; EXT_START as usize];
        let dir_len = 12 + entries.len() * 12;
        buf.extend_from_slice(&((dir_len + payload.len()) as u32).to_be_bytes());
        buf.extend_from_slice(&(dir_len as u32).to_be_bytes());
        buf.extend_from_slice(&[0, 0, 0]);
        buf.push(entries.len() as u8);
        for (id1, id2, start, len) in entries {
            buf.extend_from_slice(&id1.to_be_bytes());
            buf.extend_from_slice(&id2.to_be_bytes());
            buf.extend_from_slice(&start.to_be_bytes());
            buf.extend_from_slice(&len.to_be_bytes());
        }
        buf.extend_from_slice(payload);
        Bytes::from(buf)
    }

    #[test]
    fn zero_start_means_no_extensions() {
        let mut r = BitReader::new(Bytes::from_static(&[1, 2, 3]));
        assert_eq!(read_ext_data(&mut r, 0).unwrap(), Vec::new());
    }

    #[test]
    fn walks_declared_entries() {
        // one 4-byte payload right after the 24-byte directory
        let mut r = BitReader::new(file_with_table(
            &[(2, 5, 24, 4)],
            &[0xDE, 0xAD, 0xBE, 0xEF],
        ));
        let entries = read_ext_data(&mut r, EXT_START).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].id1, entries[0].id2), (2, 5));
        assert_eq!(entries[0].data, Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]));
    }

    #[test]
    fn out_of_range_payload_is_invalid_length() {
        let mut r = BitReader::new(file_with_table(&[(1, 1, 24, 64)], &[0u8; 4]));
        assert!(matches!(
            read_ext_data(&mut r, EXT_START),
            Err(BitsError::InvalidLength { .. })
        ));
    }
}
