use crate::epmap::{AccessPoint, EpMap};
use crate::stream::{CodingType, StreamAttr};
use crate::{ClpiError, Result};
use bits::ExtDataEntry;

/// A fully parsed clip-info file.
///
/// Immutable once parsed; navigation sessions share records through an
/// `Arc` kept in the disc-session cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRecord {
    pub version: [u8; 4],
    pub clip_stream_type: u8,
    pub application_type: u8,
    pub is_atc_delta: bool,
    /// Transport rate in bytes per second.
    pub ts_recording_rate: u32,
    /// Total number of 192-byte source packets in the clip.
    pub num_source_packets: u32,
    pub atc_sequences: Vec<AtcSequence>,
    pub programs: Vec<Program>,
    /// One Entry Point Map per indexed PID.
    pub ep_maps: Vec<EpMap>,
    /// Raw extension blocks, recognized or not.
    pub ext_data: Vec<ExtDataEntry>,
}

/// Arrival-time-clock discontinuity boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtcSequence {
    pub spn_atc_start: u32,
    pub offset_stc_id: u8,
    pub stc_sequences: Vec<StcSequence>,
}

/// System-time-clock sequence within an ATC sequence; maps a time base
/// to its starting packet, which is what aligns per-angle clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StcSequence {
    pub pcr_pid: u16,
    pub spn_stc_start: u32,
    pub presentation_start_time: u32,
    pub presentation_end_time: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub spn_program_sequence_start: u32,
    pub program_map_pid: u16,
    pub num_groups: u8,
    pub streams: Vec<ProgramStream>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramStream {
    pub pid: u16,
    pub coding_type: CodingType,
    pub attr: StreamAttr,
}

impl ClipRecord {
    /// Strict per-PID accessor.
    pub fn ep_map(&self, pid: u16) -> Result<&EpMap> {
        self.ep_maps
            .iter()
            .find(|m| m.pid == pid)
            .ok_or(ClpiError::UnresolvedReference { pid })
    }

    /// The map navigation uses by default: the first indexed PID,
    /// which discs author as the primary video stream.
    pub fn first_ep_map(&self) -> Option<&EpMap> {
        self.ep_maps.first()
    }

    /// Timestamp-to-packet conversion on the primary map. A clip with
    /// no Entry Point Map degenerates to packet 0 / the total count,
    /// never an error.
    pub fn packet_for_timestamp(&self, ts: u64, before: bool) -> u32 {
        match self.first_ep_map() {
            Some(map) => map.packet_for_timestamp(ts, before, self.num_source_packets),
            None => {
                if before {
                    0
                } else {
                    self.num_source_packets
                }
            }
        }
    }

    /// Packet-to-timestamp conversion on the primary map.
    pub fn timestamp_for_packet(&self, pkt: u32, next: bool, angle_change: bool) -> AccessPoint {
        match self.first_ep_map() {
            Some(map) => map.timestamp_for_packet(pkt, next, angle_change, self.num_source_packets),
            None => AccessPoint {
                packet: if next { self.num_source_packets } else { 0 },
                timestamp: 0,
            },
        }
    }
}
