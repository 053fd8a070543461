//! Bit-precise parser for clip-info files.
//!
//! Block offsets come from the header, not from file order, so every
//! block parse starts with an absolute seek. Any structural error
//! (truncation, a declared length past the buffer) aborts this file;
//! the caller retries the backup copy.

use bits::{BitReader, BitsError, ExtDataEntry, FileHeader, read_ext_data};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::epmap::{EpCoarse, EpFine, EpMap};
use crate::types::{AtcSequence, ClipRecord, Program, ProgramStream, StcSequence};
use crate::{Result, stream};

pub const CLPI_MAGIC: &[u8; 4] = b"HDMV";
pub const CLPI_VERSIONS: &[&[u8; 4]] = &[b"0100", b"0200", b"0300"];

const CLIP_INFO_START: u64 = 40;

/// Parses one clip-info file image.
pub fn parse_clip(data: Bytes) -> Result<ClipRecord> {
    let mut r = BitReader::new(data);
    let header = FileHeader::read(&mut r, CLPI_MAGIC, CLPI_VERSIONS)?;

    let sequence_info_start = r.read_u32()? as u64;
    let program_info_start = r.read_u32()? as u64;
    let cpi_start = r.read_u32()? as u64;
    let _clip_mark_start = r.read_u32()?; // menu thumbnails, not navigation
    let ext_data_start = r.read_u32()? as u64;

    r.seek(CLIP_INFO_START)?;
    let len = r.read_u32()? as u64;
    check_block(&r, CLIP_INFO_START, len)?;
    r.skip_bytes(2)?;
    let clip_stream_type = r.read_u8()?;
    let application_type = r.read_u8()?;
    r.skip(31)?;
    let is_atc_delta = r.read_bool()?;
    let ts_recording_rate = r.read_u32()?;
    let num_source_packets = r.read_u32()?;

    let atc_sequences = parse_sequence_info(&mut r, sequence_info_start)?;
    let programs = parse_program_info(&mut r, program_info_start)?;
    let ep_maps = parse_cpi(&mut r, cpi_start)?;
    let ext_data = read_ext_data(&mut r, ext_data_start)?;
    log_extensions(&ext_data);

    for map in &ep_maps {
        map.check_consistency(num_source_packets);
    }

    debug!(
        version = ?header.version,
        packets = num_source_packets,
        streams = programs.iter().map(|p| p.streams.len()).sum::<usize>(),
        ep_maps = ep_maps.len(),
        "parsed clip info"
    );

    Ok(ClipRecord {
        version: header.version,
        clip_stream_type,
        application_type,
        is_atc_delta,
        ts_recording_rate,
        num_source_packets,
        atc_sequences,
        programs,
        ep_maps,
        ext_data,
    })
}

/// A block's length field counts the bytes that follow it; anything
/// past the buffer is a structural failure for the whole file.
fn check_block(r: &BitReader, start: u64, len: u64) -> Result<()> {
    let available = r.len() as u64;
    if start + 4 + len > available {
        return Err(BitsError::InvalidLength {
            start,
            len,
            available,
        }
        .into());
    }
    Ok(())
}

fn parse_sequence_info(r: &mut BitReader, start: u64) -> Result<Vec<AtcSequence>> {
    r.seek(start)?;
    let len = r.read_u32()? as u64;
    check_block(r, start, len)?;
    r.skip_bytes(1)?;
    let num_atc = r.read_u8()?;

    let mut atc_sequences = Vec::with_capacity(num_atc as usize);
    for _ in 0..num_atc {
        let spn_atc_start = r.read_u32()?;
        let num_stc = r.read_u8()?;
        let offset_stc_id = r.read_u8()?;
        let mut stc_sequences = Vec::with_capacity(num_stc as usize);
        for _ in 0..num_stc {
            stc_sequences.push(StcSequence {
                pcr_pid: r.read_u16()?,
                spn_stc_start: r.read_u32()?,
                presentation_start_time: r.read_u32()?,
                presentation_end_time: r.read_u32()?,
            });
        }
        atc_sequences.push(AtcSequence {
            spn_atc_start,
            offset_stc_id,
            stc_sequences,
        });
    }
    Ok(atc_sequences)
}

fn parse_program_info(r: &mut BitReader, start: u64) -> Result<Vec<Program>> {
    r.seek(start)?;
    let len = r.read_u32()? as u64;
    check_block(r, start, len)?;
    r.skip_bytes(1)?;
    let num_programs = r.read_u8()?;

    let mut programs = Vec::with_capacity(num_programs as usize);
    for _ in 0..num_programs {
        let spn_program_sequence_start = r.read_u32()?;
        let program_map_pid = r.read_u16()?;
        let num_streams = r.read_u8()?;
        let num_groups = r.read_u8()?;
        let mut streams = Vec::with_capacity(num_streams as usize);
        for _ in 0..num_streams {
            let pid = r.read_u16()?;
            let (coding_type, attr) = stream::read_stream_attr(r)?;
            streams.push(ProgramStream {
                pid,
                coding_type,
                attr,
            });
        }
        programs.push(Program {
            spn_program_sequence_start,
            program_map_pid,
            num_groups,
            streams,
        });
    }
    Ok(programs)
}

/// Characteristic-point information: the per-PID Entry Point Maps.
fn parse_cpi(r: &mut BitReader, start: u64) -> Result<Vec<EpMap>> {
    r.seek(start)?;
    let len = r.read_u32()? as u64;
    if len == 0 {
        return Ok(Vec::new());
    }
    check_block(r, start, len)?;

    r.skip(12)?;
    let cpi_type = r.read(4)? as u8;
    if cpi_type != 1 {
        warn!(cpi_type, "not an EP-map CPI block, ignoring");
        return Ok(Vec::new());
    }

    // stream start addresses are relative to here
    let ep_map_pos = start + 6;
    r.skip_bytes(1)?;
    let num_stream_pid = r.read_u8()?;

    struct StreamHeader {
        pid: u16,
        ep_stream_type: u8,
        num_coarse: u32,
        num_fine: u32,
        start_addr: u64,
    }

    let mut headers = Vec::with_capacity(num_stream_pid as usize);
    for _ in 0..num_stream_pid {
        let pid = r.read_u16()?;
        r.skip(10)?;
        let ep_stream_type = r.read(4)? as u8;
        let num_coarse = r.read(16)? as u32;
        let num_fine = r.read(18)? as u32;
        let start_addr = r.read_u32()? as u64;
        headers.push(StreamHeader {
            pid,
            ep_stream_type,
            num_coarse,
            num_fine,
            start_addr,
        });
    }

    let mut maps = Vec::with_capacity(headers.len());
    for h in headers {
        let stream_start = ep_map_pos + h.start_addr;
        r.seek(stream_start)?;
        let fine_table_start = r.read_u32()? as u64;

        let mut coarse = Vec::with_capacity(h.num_coarse as usize);
        for _ in 0..h.num_coarse {
            coarse.push(EpCoarse {
                ref_fine_id: r.read(18)? as u32,
                pts: r.read(14)? as u32,
                spn: r.read_u32()?,
            });
        }

        r.seek(stream_start + fine_table_start)?;
        let mut fine = Vec::with_capacity(h.num_fine as usize);
        for _ in 0..h.num_fine {
            fine.push(EpFine {
                is_angle_change: r.read_bool()?,
                end_offset: r.read(3)? as u8,
                pts: r.read(11)? as u32,
                spn: r.read(17)? as u32,
            });
        }

        maps.push(EpMap {
            pid: h.pid,
            stream_type: h.ep_stream_type,
            coarse,
            fine,
        });
    }
    Ok(maps)
}

fn log_extensions(entries: &[ExtDataEntry]) {
    for e in entries {
        match (e.id1, e.id2) {
            (1, 2) => debug!(len = e.data.len(), "LPCM downmix coefficient extension"),
            (2, 4) => debug!(len = e.data.len(), "extent start point extension"),
            (2, 5) => debug!(len = e.data.len(), "multiview program info extension"),
            (id1, id2) => warn!(id1, id2, "skipping unknown clip extension block"),
        }
    }
}

#[cfg(test)]
mod tests {
    use bits::BitsError;

    use super::*;
    use crate::ClpiError;
    use crate::epmap::{join_packet, join_timestamp};

    const TOTAL_PACKETS: u32 = 0x80000;

    fn be32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    fn be16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    /// `{length u32, body}` with the length computed from the body.
    fn block(body: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len() + 4);
        be32(&mut out, body.len() as u32);
        out.extend_from_slice(&body);
        out
    }

    fn clip_info_body() -> Vec<u8> {
        let mut b = Vec::new();
        be16(&mut b, 0); // reserved
        b.push(1); // clip_stream_type
        b.push(1); // application_type: main TS for a main-path
        be32(&mut b, 1); // reserved<<1 | is_atc_delta
        be32(&mut b, 48_000_000); // ts_recording_rate
        be32(&mut b, TOTAL_PACKETS);
        b
    }

    fn sequence_info_body() -> Vec<u8> {
        let mut b = vec![0, 1]; // reserved, one ATC sequence
        be32(&mut b, 0); // spn_atc_start
        b.push(1); // one STC sequence
        b.push(0); // offset_stc_id
        be16(&mut b, 0x1001); // pcr_pid
        be32(&mut b, 0); // spn_stc_start
        be32(&mut b, 0); // presentation_start_time
        be32(&mut b, 27_000_000); // presentation_end_time
        b
    }

    fn program_info_body() -> Vec<u8> {
        let mut b = vec![0, 1]; // reserved, one program
        be32(&mut b, 0); // spn_program_sequence_start
        be16(&mut b, 0x0100); // program_map_pid
        b.push(2); // two streams
        b.push(1); // one group
        // H.264 1080p video on PID 0x1011
        be16(&mut b, 0x1011);
        b.extend_from_slice(&[5, 0x1B, 0x61, 0x30, 0x00, 0x00]);
        // LPCM audio on PID 0x1100
        be16(&mut b, 0x1100);
        b.extend_from_slice(&[5, 0x80, 0x61, b'e', b'n', b'g']);
        b
    }

    fn coarse_entry(ref_fine_id: u64, pts: u64, spn: u32) -> [u8; 8] {
        let v = (ref_fine_id << 46) | (pts << 32) | spn as u64;
        v.to_be_bytes()
    }

    fn fine_entry(angle_change: bool, end_offset: u32, pts: u32, spn: u32) -> [u8; 4] {
        let v = ((angle_change as u32) << 31) | (end_offset << 28) | (pts << 17) | spn;
        v.to_be_bytes()
    }

    fn cpi_body() -> Vec<u8> {
        let mut b = Vec::new();
        be16(&mut b, 0x0001); // 12 reserved bits + cpi_type 1
        b.push(0); // reserved
        b.push(1); // one stream PID
        // pid 16 | reserved 10 | type 4 | coarse 16 | fine 18
        let hdr: u64 = ((0x1011u64) << 48) | (1 << 34) | (2 << 18) | 4;
        b.extend_from_slice(&hdr.to_be_bytes());
        be32(&mut b, 14); // stream block offset from EP-map start
        // stream block: fine-table offset, 2 coarse, 4 fine
        be32(&mut b, 4 + 16);
        b.extend_from_slice(&coarse_entry(0, 0, 0));
        b.extend_from_slice(&coarse_entry(2, 2, 0x40000));
        b.extend_from_slice(&fine_entry(false, 1, 1, 0x100));
        b.extend_from_slice(&fine_entry(false, 1, 0x200, 0x1000));
        b.extend_from_slice(&fine_entry(false, 1, 1, 0x100));
        b.extend_from_slice(&fine_entry(true, 1, 0x300, 0x1F000));
        b
    }

    fn ext_body() -> Vec<u8> {
        let mut b = Vec::new();
        be32(&mut b, 24); // data block start
        b.extend_from_slice(&[0, 0, 0, 1]); // reserved + one entry
        be16(&mut b, 9);
        be16(&mut b, 9); // unknown (id1, id2)
        be32(&mut b, 24);
        be32(&mut b, 4);
        b.extend_from_slice(&[0xCA, 0xFE, 0xBA, 0xBE]);
        b
    }

    fn sample_clpi() -> Vec<u8> {
        let clip_info = block(clip_info_body());
        let seq = block(sequence_info_body());
        let prog = block(program_info_body());
        let cpi = block(cpi_body());
        let ext = block(ext_body());

        let seq_start = 40 + clip_info.len() as u32;
        let prog_start = seq_start + seq.len() as u32;
        let cpi_start = prog_start + prog.len() as u32;
        let ext_start = cpi_start + cpi.len() as u32;

        let mut f = b"HDMV0200".to_vec();
        be32(&mut f, seq_start);
        be32(&mut f, prog_start);
        be32(&mut f, cpi_start);
        be32(&mut f, 0); // clip mark, unused
        be32(&mut f, ext_start);
        f.resize(40, 0);
        f.extend_from_slice(&clip_info);
        f.extend_from_slice(&seq);
        f.extend_from_slice(&prog);
        f.extend_from_slice(&cpi);
        f.extend_from_slice(&ext);
        f
    }

    #[test]
    fn parses_all_blocks() {
        let record = parse_clip(Bytes::from(sample_clpi())).unwrap();

        assert_eq!(record.version, *b"0200");
        assert!(record.is_atc_delta);
        assert_eq!(record.num_source_packets, TOTAL_PACKETS);

        assert_eq!(record.atc_sequences.len(), 1);
        let stc = &record.atc_sequences[0].stc_sequences[0];
        assert_eq!(stc.pcr_pid, 0x1001);
        assert_eq!(stc.presentation_end_time, 27_000_000);

        let streams = &record.programs[0].streams;
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].pid, 0x1011);
        assert!(streams[0].coding_type.is_video());
        assert!(streams[1].coding_type.is_lossless_audio());

        let map = record.ep_map(0x1011).unwrap();
        assert_eq!(map.coarse.len(), 2);
        assert_eq!(map.fine.len(), 4);
        assert_eq!(
            join_packet(map.coarse[1].spn, map.fine[3].spn),
            0x40000 | 0x1F000
        );
        assert!(map.fine[3].is_angle_change);

        assert_eq!(record.ext_data.len(), 1);
        assert_eq!(record.ext_data[0].data.len(), 4);
    }

    #[test]
    fn lookup_through_record_uses_declared_total() {
        let record = parse_clip(Bytes::from(sample_clpi())).unwrap();
        let far_future = join_timestamp(2, 0x300) + 1_000_000;
        assert_eq!(record.packet_for_timestamp(far_future, true), TOTAL_PACKETS);
        assert_eq!(record.packet_for_timestamp(0, true), 0);
    }

    #[test]
    fn parsing_twice_is_idempotent() {
        let data = Bytes::from(sample_clpi());
        let a = parse_clip(data.clone()).unwrap();
        let b = parse_clip(data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_pid_is_unresolved_reference() {
        let record = parse_clip(Bytes::from(sample_clpi())).unwrap();
        assert_eq!(
            record.ep_map(0x1012).unwrap_err(),
            ClpiError::UnresolvedReference { pid: 0x1012 }
        );
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut data = sample_clpi();
        data[..4].copy_from_slice(b"MPLS");
        assert!(matches!(
            parse_clip(Bytes::from(data)),
            Err(ClpiError::Bits(BitsError::MagicMismatch { .. }))
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut data = sample_clpi();
        data[4..8].copy_from_slice(b"9100");
        assert!(matches!(
            parse_clip(Bytes::from(data)),
            Err(ClpiError::Bits(BitsError::UnsupportedVersion { .. }))
        ));
    }

    #[test]
    fn truncated_file_fails() {
        let data = sample_clpi();
        let cut = Bytes::copy_from_slice(&data[..data.len() / 2]);
        assert!(matches!(
            parse_clip(cut),
            Err(ClpiError::Bits(
                BitsError::Truncated { .. }
                    | BitsError::SeekOutOfRange { .. }
                    | BitsError::InvalidLength { .. }
            ))
        ));
    }

    #[test]
    fn empty_cpi_yields_no_maps() {
        // rebuild with a zero-length CPI block
        let clip_info = block(clip_info_body());
        let seq = block(sequence_info_body());
        let prog = block(program_info_body());
        let seq_start = 40 + clip_info.len() as u32;
        let prog_start = seq_start + seq.len() as u32;
        let cpi_start = prog_start + prog.len() as u32;

        let mut f = b"HDMV0100".to_vec();
        be32(&mut f, seq_start);
        be32(&mut f, prog_start);
        be32(&mut f, cpi_start);
        be32(&mut f, 0);
        be32(&mut f, 0);
        f.resize(40, 0);
        f.extend_from_slice(&clip_info);
        f.extend_from_slice(&seq);
        f.extend_from_slice(&prog);
        be32(&mut f, 0); // empty CPI

        let record = parse_clip(Bytes::from(f)).unwrap();
        assert!(record.ep_maps.is_empty());
        assert_eq!(record.packet_for_timestamp(90_000, true), 0);
        assert_eq!(
            record.packet_for_timestamp(90_000, false),
            record.num_source_packets
        );
    }
}
