//! In-memory disc images for navigation tests: a map-backed byte source
//! plus builders that emit well-formed clip-info and playlist files.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;

use bdnav::{ByteSource, PropertyStore};
use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;

/// One minute in 45 kHz ticks.
pub const MINUTE: u32 = 60 * 45_000;

/// Routes parse logs through the test harness; `RUST_LOG` filters apply.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
pub struct MemSource {
    files: HashMap<String, Vec<u8>>,
}

impl MemSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(path.to_string(), data);
    }
}

impl ByteSource for MemSource {
    fn open(&self, path: &str) -> io::Result<Box<dyn bdnav::SeekRead>> {
        self.files
            .get(path)
            .map(|d| Box::new(io::Cursor::new(d.clone())) as Box<dyn bdnav::SeekRead>)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn size(&self, path: &str) -> io::Result<u64> {
        self.files
            .get(path)
            .map(|d| d.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let prefix = format!("{path}/");
        let names: Vec<String> = self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, path.to_string()));
        }
        Ok(names)
    }
}

pub struct Props(pub HashMap<String, String>);

impl Props {
    pub fn one(key: &str, value: &str) -> Self {
        Self(HashMap::from([(key.to_string(), value.to_string())]))
    }
}

impl PropertyStore for Props {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// An entry point to index: timestamp (low 8 bits must be zero) and the
/// packet it starts at.
#[derive(Clone, Copy)]
pub struct EpPoint {
    pub ts: u64,
    pub pkt: u32,
    pub angle_change: bool,
}

pub fn ep(ts: u64, pkt: u32) -> EpPoint {
    EpPoint {
        ts,
        pkt,
        angle_change: false,
    }
}

pub fn ep_angle(ts: u64, pkt: u32) -> EpPoint {
    EpPoint {
        ts,
        pkt,
        angle_change: true,
    }
}

fn block(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 4);
    out.write_u32::<BigEndian>(body.len() as u32).unwrap();
    out.extend_from_slice(body);
    out
}

/// Builds a clip-info file with one EP map on PID 0x1011, one coarse
/// bucket per point. Points must be ascending in both time and packet.
pub fn clpi_file(total_packets: u32, points: &[EpPoint]) -> Vec<u8> {
    let mut clip_info = Vec::new();
    clip_info.write_u16::<BigEndian>(0).unwrap();
    clip_info.push(1); // clip_stream_type
    clip_info.push(1); // application_type
    clip_info.write_u32::<BigEndian>(0).unwrap(); // no ATC delta
    clip_info.write_u32::<BigEndian>(48_000_000).unwrap();
    clip_info.write_u32::<BigEndian>(total_packets).unwrap();
    let clip_info = block(&clip_info);

    let mut seq = vec![0, 1];
    seq.write_u32::<BigEndian>(0).unwrap();
    seq.push(1);
    seq.push(0);
    seq.write_u16::<BigEndian>(0x1001).unwrap();
    seq.write_u32::<BigEndian>(0).unwrap();
    seq.write_u32::<BigEndian>(0).unwrap();
    seq.write_u32::<BigEndian>(27_000_000).unwrap();
    let seq = block(&seq);

    let mut prog = vec![0, 1];
    prog.write_u32::<BigEndian>(0).unwrap();
    prog.write_u16::<BigEndian>(0x0100).unwrap();
    prog.push(1); // one stream
    prog.push(1);
    prog.write_u16::<BigEndian>(0x1011).unwrap();
    prog.extend_from_slice(&[5, 0x1B, 0x61, 0x30, 0x00, 0x00]);
    let prog = block(&prog);

    let n = points.len() as u32;
    let mut cpi = Vec::new();
    cpi.write_u16::<BigEndian>(0x0001).unwrap(); // cpi_type 1
    cpi.push(0);
    cpi.push(1); // one stream PID
    let hdr: u64 = (0x1011u64 << 48) | (1 << 34) | ((n as u64) << 18) | n as u64;
    cpi.write_u64::<BigEndian>(hdr).unwrap();
    cpi.write_u32::<BigEndian>(14).unwrap(); // stream block offset
    cpi.write_u32::<BigEndian>(4 + n * 8).unwrap(); // fine table offset
    for (i, p) in points.iter().enumerate() {
        let coarse_pts = ((p.ts >> 19) << 1) & 0x3FFF;
        let coarse_spn = (p.pkt & !0x1FFFF) as u64;
        let v = ((i as u64) << 46) | (coarse_pts << 32) | coarse_spn;
        cpi.write_u64::<BigEndian>(v).unwrap();
    }
    for p in points {
        let fine_pts = ((p.ts >> 8) & 0x7FF) as u32;
        let fine_spn = p.pkt & 0x1FFFF;
        let v =
            ((p.angle_change as u32) << 31) | (1 << 28) | (fine_pts << 17) | fine_spn;
        cpi.write_u32::<BigEndian>(v).unwrap();
    }
    let cpi = block(&cpi);

    let seq_start = 40 + clip_info.len() as u32;
    let prog_start = seq_start + seq.len() as u32;
    let cpi_start = prog_start + prog.len() as u32;

    let mut f = b"HDMV0200".to_vec();
    f.write_u32::<BigEndian>(seq_start).unwrap();
    f.write_u32::<BigEndian>(prog_start).unwrap();
    f.write_u32::<BigEndian>(cpi_start).unwrap();
    f.write_u32::<BigEndian>(0).unwrap(); // clip marks
    f.write_u32::<BigEndian>(0).unwrap(); // no extensions
    f.resize(40, 0);
    f.extend_from_slice(&clip_info);
    f.extend_from_slice(&seq);
    f.extend_from_slice(&prog);
    f.extend_from_slice(&cpi);
    f
}

fn stream_pair(pid: u16, attr: &[u8]) -> Vec<u8> {
    let mut b = vec![3, 1];
    b.write_u16::<BigEndian>(pid).unwrap();
    b.extend_from_slice(attr);
    b
}

fn stn_table(streams: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut counts = [0u8; 8];
    for (cat, _) in streams {
        counts[*cat as usize] += 1;
    }
    let mut body = vec![0, 0];
    body.extend_from_slice(&counts);
    body.extend_from_slice(&[0, 0, 0, 0]);
    for cat in 0..4u8 {
        for (c, bytes) in streams {
            if *c == cat {
                body.extend_from_slice(bytes);
            }
        }
    }
    let mut out = Vec::new();
    out.write_u16::<BigEndian>(body.len() as u16).unwrap();
    out.extend_from_slice(&body);
    out
}

/// 1080p AVC video with one AC-3 track and one PG subtitle.
pub fn stn_avc_1080() -> Vec<u8> {
    stn_table(&[
        (0, stream_pair(0x1011, &[5, 0x1B, 0x61, 0x30, 0x00, 0x00])),
        (1, stream_pair(0x1100, &[5, 0x81, 0x61, b'e', b'n', b'g'])),
        (2, stream_pair(0x1200, &[4, 0x90, b'e', b'n', b'g'])),
    ])
}

/// 2160p HEVC video with one AC-3 track.
pub fn stn_hevc_2160() -> Vec<u8> {
    stn_table(&[
        (0, stream_pair(0x1011, &[5, 0x24, 0x81, 0x30, 0x09, 0x00])),
        (1, stream_pair(0x1100, &[5, 0x81, 0x61, b'e', b'n', b'g'])),
    ])
}

pub struct ItemSpec<'a> {
    pub clip_id: &'a str,
    pub cc: u8,
    pub in_time: u32,
    pub out_time: u32,
    pub angles: &'a [&'a str],
    pub stn: Vec<u8>,
}

pub fn item(clip_id: &str, cc: u8, in_time: u32, out_time: u32) -> ItemSpec<'_> {
    ItemSpec {
        clip_id,
        cc,
        in_time,
        out_time,
        angles: &[],
        stn: stn_avc_1080(),
    }
}

pub fn mark_entry(item: u16, time: u32) -> (u8, u16, u32) {
    (1, item, time)
}

pub fn mark_link(item: u16, time: u32) -> (u8, u16, u32) {
    (2, item, time)
}

/// Builds a playlist file from item and mark specs.
pub fn mpls_file(items: &[ItemSpec], marks: &[(u8, u16, u32)]) -> Vec<u8> {
    let mut playlist_body = Vec::new();
    playlist_body.write_u16::<BigEndian>(0).unwrap();
    playlist_body
        .write_u16::<BigEndian>(items.len() as u16)
        .unwrap();
    playlist_body.write_u16::<BigEndian>(0).unwrap(); // no sub paths

    for spec in items {
        let mut b = Vec::new();
        b.extend_from_slice(spec.clip_id.as_bytes());
        b.extend_from_slice(b"M2TS");
        let multi = !spec.angles.is_empty();
        b.write_u16::<BigEndian>(((multi as u16) << 4) | spec.cc as u16)
            .unwrap();
        b.push(0); // stc_id
        b.write_u32::<BigEndian>(spec.in_time).unwrap();
        b.write_u32::<BigEndian>(spec.out_time).unwrap();
        b.extend_from_slice(&[0; 8]); // uo mask
        b.push(0);
        b.push(0); // still mode
        b.write_u16::<BigEndian>(0).unwrap();
        if multi {
            b.push(1 + spec.angles.len() as u8);
            b.push(0b01); // seamless angle change
            for angle in spec.angles {
                b.extend_from_slice(angle.as_bytes());
                b.extend_from_slice(b"M2TS");
                b.push(0);
            }
        }
        b.extend_from_slice(&spec.stn);
        playlist_body
            .write_u16::<BigEndian>(b.len() as u16)
            .unwrap();
        playlist_body.extend_from_slice(&b);
    }

    let mut mark_body = Vec::new();
    mark_body
        .write_u16::<BigEndian>(marks.len() as u16)
        .unwrap();
    for (kind, item, time) in marks {
        mark_body.push(0);
        mark_body.push(*kind);
        mark_body.write_u16::<BigEndian>(*item).unwrap();
        mark_body.write_u32::<BigEndian>(*time).unwrap();
        mark_body.write_u16::<BigEndian>(0xFFFF).unwrap();
        mark_body.write_u32::<BigEndian>(0).unwrap();
    }

    let mut app_info = Vec::new();
    app_info.push(0);
    app_info.push(1); // standard playback
    app_info.write_u16::<BigEndian>(0).unwrap();
    app_info.extend_from_slice(&[0; 8]);
    app_info.write_u16::<BigEndian>(0).unwrap();

    let playlist_start = 40 + 4 + app_info.len() as u32;
    let mark_start = playlist_start + 4 + playlist_body.len() as u32;

    let mut f = b"MPLS0200".to_vec();
    f.write_u32::<BigEndian>(playlist_start).unwrap();
    f.write_u32::<BigEndian>(mark_start).unwrap();
    f.write_u32::<BigEndian>(0).unwrap();
    f.resize(40, 0);
    f.write_u32::<BigEndian>(app_info.len() as u32).unwrap();
    f.extend_from_slice(&app_info);
    f.write_u32::<BigEndian>(playlist_body.len() as u32).unwrap();
    f.extend_from_slice(&playlist_body);
    f.write_u32::<BigEndian>(mark_body.len() as u32).unwrap();
    f.extend_from_slice(&mark_body);
    f
}
