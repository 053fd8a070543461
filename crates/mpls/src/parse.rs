//! Bit-precise parser for playlist files.
//!
//! Play-item and stream records are length-prefixed; the parser reads
//! the fields it knows and seeks past each record's declared length, so
//! reserved tails and future fields never desynchronize it.

use bits::{BitReader, BitsError, ExtDataEntry, FileHeader, read_ext_data};
use bytes::Bytes;
use clpi::stream::read_stream_attr;
use tracing::{debug, warn};

use crate::Result;
use crate::types::{
    AngleClip, ConnectionCondition, MarkKind, PlayItem, PlayMark, PlaybackType, PlaylistRecord,
    StnStream, StreamEntry, StreamTable, SubPath, SubPlayItem,
};

pub const MPLS_MAGIC: &[u8; 4] = b"MPLS";
pub const MPLS_VERSIONS: &[&[u8; 4]] = &[b"0100", b"0200", b"0300"];

const APP_INFO_START: u64 = 40;

/// Parses one playlist file image.
pub fn parse_playlist(data: Bytes) -> Result<PlaylistRecord> {
    let mut r = BitReader::new(data);
    let header = FileHeader::read(&mut r, MPLS_MAGIC, MPLS_VERSIONS)?;

    let playlist_start = r.read_u32()? as u64;
    let mark_start = r.read_u32()? as u64;
    let ext_data_start = r.read_u32()? as u64;

    r.seek(APP_INFO_START)?;
    let len = r.read_u32()? as u64;
    check_block(&r, APP_INFO_START, len)?;
    r.skip_bytes(1)?;
    let playback_type = PlaybackType::from(r.read_u8()?);
    let playback_count = r.read_u16()?;
    let uo_mask = r.read_u64()?;

    r.seek(playlist_start)?;
    let len = r.read_u32()? as u64;
    check_block(&r, playlist_start, len)?;
    r.skip_bytes(2)?;
    let num_play_items = r.read_u16()?;
    let num_sub_paths = r.read_u16()?;

    let mut play_items = Vec::with_capacity(num_play_items as usize);
    for _ in 0..num_play_items {
        play_items.push(parse_play_item(&mut r)?);
    }
    let mut sub_paths = Vec::with_capacity(num_sub_paths as usize);
    for _ in 0..num_sub_paths {
        sub_paths.push(parse_sub_path(&mut r)?);
    }

    let marks = parse_marks(&mut r, mark_start)?;
    let ext_data = read_ext_data(&mut r, ext_data_start)?;
    log_extensions(&ext_data);

    debug!(
        version = ?header.version,
        items = play_items.len(),
        sub_paths = sub_paths.len(),
        marks = marks.len(),
        "parsed playlist"
    );

    Ok(PlaylistRecord {
        version: header.version,
        playback_type,
        playback_count,
        uo_mask,
        play_items,
        sub_paths,
        marks,
        ext_data,
    })
}

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

fn parse_play_item(r: &mut BitReader) -> Result<PlayItem> {
    let len = r.read_u16()? as u64;
    let end = r.position() as u64 + len;

    let clip_id = r.read_string(5)?;
    let codec_id = r.read_string(4)?;
    r.skip(11)?;
    let is_multi_angle = r.read_bool()?;
    let connection_condition = ConnectionCondition::from(r.read(4)? as u8);
    let stc_id = r.read_u8()?;
    let in_time = r.read_u32()?;
    let out_time = r.read_u32()?;
    let uo_mask = r.read_u64()?;
    let random_access_flag = r.read_bool()?;
    r.skip(7)?;
    let still_mode = r.read_u8()?;
    let still_time = r.read_u16()?;

    if out_time <= in_time {
        warn!(clip = %clip_id, in_time, out_time, "play item out-time not after in-time");
    }

    let mut angles = vec![AngleClip {
        clip_id,
        codec_id,
        stc_id,
    }];
    let mut is_different_audios = false;
    let mut is_seamless_angle_change = false;
    if is_multi_angle {
        let num_angles = r.read_u8()?;
        r.skip(6)?;
        is_different_audios = r.read_bool()?;
        is_seamless_angle_change = r.read_bool()?;
        for _ in 1..num_angles {
            angles.push(AngleClip {
                clip_id: r.read_string(5)?,
                codec_id: r.read_string(4)?,
                stc_id: r.read_u8()?,
            });
        }
    }

    let stn = parse_stn(r)?;

    r.seek(end)?;
    Ok(PlayItem {
        connection_condition,
        in_time,
        out_time,
        uo_mask,
        random_access_flag,
        still_mode,
        still_time,
        is_different_audios,
        is_seamless_angle_change,
        angles,
        stn,
    })
}

fn parse_stream_entry(r: &mut BitReader) -> Result<StreamEntry> {
    let len = r.read_u8()? as u64;
    let end = r.position() as u64 + len;

    let entry_type = r.read_u8()?;
    let entry = match entry_type {
        1 => StreamEntry::PlayItem {
            pid: r.read_u16()?,
        },
        2 => StreamEntry::SubPathClip {
            subpath: r.read_u8()?,
            subclip: r.read_u8()?,
            pid: r.read_u16()?,
        },
        3 | 4 => StreamEntry::SubPath {
            subpath: r.read_u8()?,
            pid: r.read_u16()?,
        },
        other => {
            warn!(entry_type = other, "unrecognized stream entry type");
            StreamEntry::Unknown(other)
        }
    };

    r.seek(end)?;
    Ok(entry)
}

fn parse_stn_stream(r: &mut BitReader) -> Result<StnStream> {
    let entry = parse_stream_entry(r)?;
    let (coding_type, attr) = read_stream_attr(r)?;
    Ok(StnStream {
        entry,
        coding_type,
        attr,
    })
}

/// Cross-reference list trailing secondary-stream attributes:
/// `{count u8, reserved u8, count × u8 refs, pad to 16-bit}`.
fn skip_ref_list(r: &mut BitReader) -> Result<()> {
    let n = r.read_u8()? as u64;
    r.skip_bytes(1)?;
    r.skip_bytes(n)?;
    if n % 2 == 1 {
        r.skip_bytes(1)?;
    }
    Ok(())
}

fn parse_stn(r: &mut BitReader) -> Result<StreamTable> {
    let len = r.read_u16()? as u64;
    let end = r.position() as u64 + len;

    r.skip(16)?;
    let num_video = r.read_u8()?;
    let num_audio = r.read_u8()?;
    let num_pg = r.read_u8()?;
    let num_ig = r.read_u8()?;
    let num_secondary_audio = r.read_u8()?;
    let num_secondary_video = r.read_u8()?;
    let num_pip_pg = r.read_u8()?;
    let num_enhancement = r.read_u8()?;
    r.skip_bytes(4)?;

    let mut stn = StreamTable::default();
    for _ in 0..num_video {
        stn.video.push(parse_stn_stream(r)?);
    }
    for _ in 0..num_audio {
        stn.audio.push(parse_stn_stream(r)?);
    }
    for _ in 0..num_pg as u16 + num_pip_pg as u16 {
        stn.graphics.push(parse_stn_stream(r)?);
    }
    for _ in 0..num_ig {
        stn.interactive.push(parse_stn_stream(r)?);
    }
    for _ in 0..num_secondary_audio {
        stn.secondary_audio.push(parse_stn_stream(r)?);
        skip_ref_list(r)?;
    }
    for _ in 0..num_secondary_video {
        stn.secondary_video.push(parse_stn_stream(r)?);
        skip_ref_list(r)?;
        skip_ref_list(r)?;
    }
    for _ in 0..num_enhancement {
        stn.enhancement.push(parse_stn_stream(r)?);
    }

    r.seek(end)?;
    Ok(stn)
}

fn parse_sub_path(r: &mut BitReader) -> Result<SubPath> {
    let len = r.read_u32()? as u64;
    let end = r.position() as u64 + len;

    r.skip_bytes(1)?;
    let path_type = r.read_u8()?;
    r.skip(15)?;
    let is_repeat = r.read_bool()?;
    r.skip_bytes(1)?;
    let num_items = r.read_u8()?;

    let mut items = Vec::with_capacity(num_items as usize);
    for _ in 0..num_items {
        items.push(parse_sub_play_item(r)?);
    }

    r.seek(end)?;
    Ok(SubPath {
        path_type,
        is_repeat,
        items,
    })
}

fn parse_sub_play_item(r: &mut BitReader) -> Result<SubPlayItem> {
    let len = r.read_u16()? as u64;
    let end = r.position() as u64 + len;

    let clip_id = r.read_string(5)?;
    let codec_id = r.read_string(4)?;
    r.skip(27)?;
    let connection_condition = ConnectionCondition::from(r.read(4)? as u8);
    let is_multi_clip = r.read_bool()?;
    let stc_id = r.read_u8()?;
    let in_time = r.read_u32()?;
    let out_time = r.read_u32()?;
    let sync_play_item_id = r.read_u16()?;
    let sync_start_pts = r.read_u32()?;

    let mut multi_clips = Vec::new();
    if is_multi_clip {
        let num_clips = r.read_u8()?;
        r.skip_bytes(1)?;
        for _ in 1..num_clips {
            multi_clips.push(AngleClip {
                clip_id: r.read_string(5)?,
                codec_id: r.read_string(4)?,
                stc_id: r.read_u8()?,
            });
        }
    }

    r.seek(end)?;
    Ok(SubPlayItem {
        clip: AngleClip {
            clip_id,
            codec_id,
            stc_id,
        },
        connection_condition,
        in_time,
        out_time,
        sync_play_item_id,
        sync_start_pts,
        multi_clips,
    })
}

fn parse_marks(r: &mut BitReader, start: u64) -> Result<Vec<PlayMark>> {
    r.seek(start)?;
    let len = r.read_u32()? as u64;
    check_block(r, start, len)?;
    let num_marks = r.read_u16()?;

    let mut marks = Vec::with_capacity(num_marks as usize);
    for _ in 0..num_marks {
        r.skip_bytes(1)?;
        marks.push(PlayMark {
            kind: MarkKind::from(r.read_u8()?),
            play_item_id: r.read_u16()?,
            time: r.read_u32()?,
            entry_es_pid: r.read_u16()?,
            duration: r.read_u32()?,
        });
    }
    Ok(marks)
}

fn log_extensions(entries: &[ExtDataEntry]) {
    for e in entries {
        match (e.id1, e.id2) {
            (1, 1) => debug!(len = e.data.len(), "picture-in-picture metadata extension"),
            (2, 1) => debug!(len = e.data.len(), "stereoscopic stream table extension"),
            (2, 2) => debug!(len = e.data.len(), "stereoscopic sub-path extension"),
            (3, 5) => debug!(len = e.data.len(), "UHD static metadata extension"),
            (id1, id2) => warn!(id1, id2, "skipping unknown playlist extension block"),
        }
    }
}
