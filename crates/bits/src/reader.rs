use bytes::Bytes;

use crate::{BitsError, Result};

/// A big-endian bit reader over an in-memory file image.
///
/// Disc metadata files are small (tens of kilobytes), so the whole file
/// is held as one [`Bytes`] buffer and byte extraction is zero-copy.
/// Reads are bit-granular; byte-oriented helpers work at any alignment
/// but are cheapest when the reader is byte-aligned.
#[derive(Debug, Clone)]
#[must_use]
pub struct BitReader {
    data: Bytes,
    byte_pos: usize,
    bit_pos: u8,
}

impl BitReader {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Total length of the underlying buffer in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current byte offset. When mid-byte this is the offset of the
    /// partially consumed byte.
    #[must_use]
    pub fn position(&self) -> usize {
        self.byte_pos
    }

    /// Bit offset within the current byte (0-7).
    #[must_use]
    pub fn bit_position(&self) -> u8 {
        self.bit_pos
    }

    #[must_use]
    pub fn remaining_bits(&self) -> u64 {
        (self.data.len() as u64)
            .saturating_mul(8)
            .saturating_sub(self.byte_pos as u64 * 8 + self.bit_pos as u64)
    }

    /// Diagnostic only: parsers log when a block ends unaligned, they
    /// never fail on it.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    fn check_available(&self, bits: u64) -> Result<()> {
        let available = self.remaining_bits();
        if bits > available {
            return Err(BitsError::Truncated {
                needed: bits - available,
                available,
            });
        }
        Ok(())
    }

    /// Reads `count` bits (at most 64) as a big-endian unsigned integer.
    pub fn read(&mut self, count: u8) -> Result<u64> {
        let count = count.min(64);
        self.check_available(count as u64)?;

        let mut value: u64 = 0;
        for _ in 0..count {
            let byte = self.data[self.byte_pos];
            let bit = (byte >> (7 - self.bit_pos)) & 1;
            value = (value << 1) | bit as u64;
            self.bit_pos += 1;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read(1)? == 1)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read(8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read(16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read(32)? as u32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read(64)
    }

    /// Extracts `count` bytes. Zero-copy when byte-aligned.
    pub fn read_bytes(&mut self, count: usize) -> Result<Bytes> {
        self.check_available(count as u64 * 8)?;

        if self.is_aligned() {
            let slice = self.data.slice(self.byte_pos..self.byte_pos + count);
            self.byte_pos += count;
            return Ok(slice);
        }

        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read(8)? as u8);
        }
        Ok(Bytes::from(out))
    }

    /// Reads `count` bytes of fixed-length text, trimming trailing NULs.
    pub fn read_string(&mut self, count: usize) -> Result<String> {
        let raw = self.read_bytes(count)?;
        let end = raw
            .iter()
            .rposition(|&b| b != 0)
            .map(|p| p + 1)
            .unwrap_or(0);
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    pub fn skip(&mut self, bits: u64) -> Result<()> {
        self.check_available(bits)?;
        let total = self.byte_pos as u64 * 8 + self.bit_pos as u64 + bits;
        self.byte_pos = (total / 8) as usize;
        self.bit_pos = (total % 8) as u8;
        Ok(())
    }

    pub fn skip_bytes(&mut self, count: u64) -> Result<()> {
        self.skip(count * 8)
    }

    /// Seeks to an absolute byte offset, resetting bit alignment.
    /// Seeking to the end of the buffer is allowed; past it is not.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.data.len() as u64 {
            return Err(BitsError::SeekOutOfRange {
                offset,
                len: self.data.len() as u64,
            });
        }
        self.byte_pos = offset as usize;
        self.bit_pos = 0;
        Ok(())
    }

    /// Slices `len` bytes starting at absolute offset `start` without
    /// moving the read position. Used for extension-data payloads.
    pub fn slice_at(&self, start: u64, len: u64) -> Result<Bytes> {
        let end = start.checked_add(len).ok_or(BitsError::InvalidLength {
            start,
            len,
            available: self.data.len() as u64,
        })?;
        if end > self.data.len() as u64 {
            return Err(BitsError::InvalidLength {
                start,
                len,
                available: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start as usize..end as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &'static [u8]) -> BitReader {
        BitReader::new(Bytes::from_static(bytes))
    }

    #[test]
    fn reads_individual_bits_msb_first() {
        let binary = 0b10101010_11001100_11110001_01010101u32;
        let mut r = BitReader::new(Bytes::copy_from_slice(&binary.to_be_bytes()));
        for i in 0..32 {
            assert_eq!(
                r.read(1).unwrap(),
                ((binary >> (31 - i)) & 1) as u64,
                "bit {i}"
            );
        }
        assert!(matches!(r.read(1), Err(BitsError::Truncated { .. })));
    }

    #[test]
    fn reads_unaligned_fields() {
        let mut r = reader(&[0b1010_1011, 0b1100_1100]);
        assert_eq!(r.read(3).unwrap(), 0b101);
        assert_eq!(r.read(6).unwrap(), 0b010111);
        assert_eq!(r.read(7).unwrap(), 0b1001100);
        assert_eq!(r.remaining_bits(), 0);
    }

    #[test]
    fn read_string_trims_trailing_nuls() {
        let mut r = reader(b"00055\0\0\0");
        assert_eq!(r.read_string(8).unwrap(), "00055");
    }

    #[test]
    fn seek_and_position() {
        let mut r = reader(&[1, 2, 3, 4]);
        r.seek(2).unwrap();
        assert_eq!(r.position(), 2);
        assert_eq!(r.read_u8().unwrap(), 3);
        assert_eq!(
            r.seek(5),
            Err(BitsError::SeekOutOfRange { offset: 5, len: 4 })
        );
        // seeking exactly to the end is fine, reading from there is not
        r.seek(4).unwrap();
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn skip_crosses_byte_boundaries() {
        let mut r = reader(&[0xFF, 0x00, 0b0100_0000]);
        r.skip(17).unwrap();
        assert!(!r.is_aligned());
        assert_eq!(r.read(1).unwrap(), 1);
    }

    #[test]
    fn read_bytes_zero_copy_when_aligned() {
        let mut r = reader(&[1, 2, 3, 4, 5]);
        r.skip_bytes(1).unwrap();
        assert_eq!(r.read_bytes(3).unwrap(), Bytes::from_static(&[2, 3, 4]));
        assert!(r.read_bytes(2).is_err());
    }

    #[test]
    fn read_bytes_unaligned_shifts() {
        let mut r = reader(&[0b1111_0000, 0b1010_1010, 0b0101_0101]);
        r.skip(4).unwrap();
        let b = r.read_bytes(2).unwrap();
        assert_eq!(&b[..], &[0b0000_1010, 0b1010_0101]);
    }

    #[test]
    fn truncated_reports_missing_bits() {
        let mut r = reader(&[0xAA]);
        assert_eq!(
            r.read_u16(),
            Err(BitsError::Truncated {
                needed: 8,
                available: 8
            })
        );
    }
}
