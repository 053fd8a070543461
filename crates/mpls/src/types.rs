use bits::ExtDataEntry;
use clpi::{CodingType, StreamAttr, VideoFormat};

/// A fully parsed playlist file.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistRecord {
    pub version: [u8; 4],
    pub playback_type: PlaybackType,
    pub playback_count: u16,
    pub uo_mask: u64,
    pub play_items: Vec<PlayItem>,
    pub sub_paths: Vec<SubPath>,
    pub marks: Vec<PlayMark>,
    pub ext_data: Vec<ExtDataEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackType {
    Standard,
    Random,
    Shuffle,
    Unknown(u8),
}

impl From<u8> for PlaybackType {
    fn from(value: u8) -> Self {
        match value {
            1 => PlaybackType::Standard,
            2 => PlaybackType::Random,
            3 => PlaybackType::Shuffle,
            other => PlaybackType::Unknown(other),
        }
    }
}

/// How a play item joins onto the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCondition {
    /// Branching / non-seamless; the start packet must be looked up.
    NonSeamless,
    /// Seamless with a clean break (code 5).
    SeamlessClean,
    /// Seamless continuation (code 6).
    Seamless,
    Unknown(u8),
}

impl From<u8> for ConnectionCondition {
    fn from(value: u8) -> Self {
        match value {
            1 => ConnectionCondition::NonSeamless,
            5 => ConnectionCondition::SeamlessClean,
            6 => ConnectionCondition::Seamless,
            other => ConnectionCondition::Unknown(other),
        }
    }
}

impl ConnectionCondition {
    /// Authoring guarantees continuity across the boundary; the new
    /// clip starts at packet 0 without an index lookup.
    pub fn is_seamless(self) -> bool {
        matches!(
            self,
            ConnectionCondition::SeamlessClean | ConnectionCondition::Seamless
        )
    }
}

/// One clip reference: the same shape serves play-item angles and
/// sub-play-item multi-clip entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AngleClip {
    pub clip_id: String,
    pub codec_id: String,
    pub stc_id: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayItem {
    pub connection_condition: ConnectionCondition,
    /// 45 kHz ticks.
    pub in_time: u32,
    pub out_time: u32,
    pub uo_mask: u64,
    pub random_access_flag: bool,
    pub still_mode: u8,
    pub still_time: u16,
    pub is_different_audios: bool,
    pub is_seamless_angle_change: bool,
    /// Angle 0 first; single-angle items have exactly one entry.
    pub angles: Vec<AngleClip>,
    pub stn: StreamTable,
}

impl PlayItem {
    pub fn angle_count(&self) -> u8 {
        self.angles.len() as u8
    }

    /// Clip for `angle`, falling back to angle 0 when out of range.
    pub fn clip_for_angle(&self, angle: u8) -> &AngleClip {
        self.angles
            .get(angle as usize)
            .unwrap_or_else(|| &self.angles[0])
    }

    /// Item duration in ticks; saturates to 0 on out-of-order times.
    pub fn duration(&self) -> u64 {
        (self.out_time as u64).saturating_sub(self.in_time as u64)
    }
}

/// Per-category stream listing of one play item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamTable {
    pub video: Vec<StnStream>,
    pub audio: Vec<StnStream>,
    /// Presentation graphics, including picture-in-picture subtitles.
    pub graphics: Vec<StnStream>,
    pub interactive: Vec<StnStream>,
    pub secondary_audio: Vec<StnStream>,
    pub secondary_video: Vec<StnStream>,
    /// Enhancement-layer (Dolby Vision) streams.
    pub enhancement: Vec<StnStream>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StnStream {
    pub entry: StreamEntry,
    pub coding_type: CodingType,
    pub attr: StreamAttr,
}

/// Where a stream lives: the stream-entry type tag on disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEntry {
    /// Type 1: an elementary stream of this play item's clip.
    PlayItem { pid: u16 },
    /// Type 2: a stream of a sub-path's sub-clip.
    SubPathClip { subpath: u8, subclip: u8, pid: u16 },
    /// Types 3 and 4: a stream of an in-mux or out-of-mux sub-path.
    SubPath { subpath: u8, pid: u16 },
    Unknown(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubPath {
    pub path_type: u8,
    pub is_repeat: bool,
    pub items: Vec<SubPlayItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubPlayItem {
    pub clip: AngleClip,
    pub connection_condition: ConnectionCondition,
    pub in_time: u32,
    pub out_time: u32,
    pub sync_play_item_id: u16,
    pub sync_start_pts: u32,
    /// Extra clips for multi-clip sub-play-items; empty otherwise.
    pub multi_clips: Vec<AngleClip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    /// Entry marks are chapters.
    Entry,
    /// Link marks are retained but not counted as chapters.
    Link,
    Unknown(u8),
}

impl From<u8> for MarkKind {
    fn from(value: u8) -> Self {
        match value {
            1 => MarkKind::Entry,
            2 => MarkKind::Link,
            other => MarkKind::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayMark {
    pub kind: MarkKind,
    /// Index of the play item the mark lives in.
    pub play_item_id: u16,
    /// Clip-relative 45 kHz timestamp.
    pub time: u32,
    pub entry_es_pid: u16,
    pub duration: u32,
}

/// Video quality summary used when ranking candidate main titles:
/// resolution class first, codec tier second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct VideoQuality {
    pub high_resolution: bool,
    pub codec_tier: u8,
}

impl PlaylistRecord {
    /// Total presentation duration in 45 kHz ticks.
    pub fn duration(&self) -> u64 {
        self.play_items.iter().map(|pi| pi.duration()).sum()
    }

    /// Entry marks only; link marks stay in `marks` but don't count.
    pub fn chapter_count(&self) -> usize {
        self.marks
            .iter()
            .filter(|m| m.kind == MarkKind::Entry)
            .count()
    }

    fn first_stn(&self) -> Option<&StreamTable> {
        self.play_items.first().map(|pi| &pi.stn)
    }

    pub fn audio_track_count(&self) -> usize {
        self.first_stn().map_or(0, |s| s.audio.len())
    }

    pub fn subtitle_track_count(&self) -> usize {
        self.first_stn().map_or(0, |s| s.graphics.len())
    }

    /// Best primary video stream: ≥1080 lines beats lower resolutions,
    /// then the codec tier decides.
    pub fn video_quality(&self) -> VideoQuality {
        let mut best = VideoQuality::default();
        if let Some(stn) = self.first_stn() {
            for s in &stn.video {
                let lines = match s.attr {
                    StreamAttr::Video { format, .. } => format.lines(),
                    _ => VideoFormat::Unknown.lines(),
                };
                let q = VideoQuality {
                    high_resolution: lines >= 1080,
                    codec_tier: s.coding_type.video_tier(),
                };
                if q > best {
                    best = q;
                }
            }
        }
        best
    }

    pub fn has_lossless_audio(&self) -> bool {
        self.first_stn()
            .is_some_and(|s| s.audio.iter().any(|a| a.coding_type.is_lossless_audio()))
    }
}
