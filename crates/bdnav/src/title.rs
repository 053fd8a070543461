use std::sync::Arc;

use clpi::{AccessPoint, ClipRecord};
use mpls::{MarkKind, PlaylistRecord};
use tracing::debug;

use crate::error::Result;

/// Angles beyond this index are ignored by angle switching.
pub const MAX_ANGLES: u8 = 8;

/// One play-item of a title, resolved against its clip record for the
/// currently selected angle.
///
/// Times are 45 kHz ticks on the clip's own timeline; `title_time` and
/// `title_pkt` are the cumulative offsets of this clip's start on the
/// title timeline.
#[derive(Debug, Clone)]
pub struct NavClip {
    pub clip_id: String,
    pub record: Arc<ClipRecord>,
    pub item_index: usize,
    pub in_time: u64,
    pub out_time: u64,
    pub start_pkt: u32,
    pub end_pkt: u32,
    pub title_time: u64,
    pub title_pkt: u32,
}

impl NavClip {
    pub fn duration(&self) -> u64 {
        self.out_time.saturating_sub(self.in_time)
    }

    pub fn packet_count(&self) -> u32 {
        self.end_pkt.saturating_sub(self.start_pkt)
    }
}

/// A playlist mark projected onto the title timeline.
#[derive(Debug, Clone)]
pub struct NavMark {
    pub kind: MarkKind,
    pub clip_index: usize,
    pub clip_time: u64,
    pub clip_pkt: u32,
    pub title_time: u64,
    pub title_pkt: u32,
    pub duration: u64,
}

impl NavMark {
    pub fn is_chapter(&self) -> bool {
        self.kind == MarkKind::Entry
    }
}

/// Result of a search: a position in both clip and title coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavPoint {
    pub clip_index: usize,
    pub clip_pkt: u32,
    pub title_pkt: u32,
    /// Clip-timeline tick of the resolved position.
    pub timestamp: u64,
}

/// A playlist assembled into a navigable whole: clips resolved for one
/// angle, marks projected, cumulative timeline computed.
#[derive(Debug, Clone)]
pub struct Title {
    pub playlist_id: String,
    pub playlist: PlaylistRecord,
    pub clips: Vec<NavClip>,
    pub marks: Vec<NavMark>,
    pub angle: u8,
    pub angle_count: u8,
    /// Total duration in 45 kHz ticks.
    pub duration: u64,
    /// Total packet count across all clips.
    pub packets: u32,
}

pub(crate) fn assemble(
    playlist_id: &str,
    playlist: PlaylistRecord,
    angle: u8,
    resolve: &mut dyn FnMut(&str) -> Result<Arc<ClipRecord>>,
) -> Result<Title> {
    let mut clips = Vec::with_capacity(playlist.play_items.len());
    let mut title_time = 0u64;
    let mut title_pkt = 0u32;

    for (item_index, item) in playlist.play_items.iter().enumerate() {
        let clip = item.clip_for_angle(angle);
        let record = resolve(&clip.clip_id)?;

        let in_time = item.in_time as u64;
        let out_time = item.out_time as u64;
        // A seamless join continues the previous clip's stream, so playback
        // starts at the first packet regardless of in_time.
        let start_pkt = if item.connection_condition.is_seamless() {
            0
        } else {
            record.packet_for_timestamp(in_time, true)
        };
        let end_pkt = record.packet_for_timestamp(out_time, false);

        let nav = NavClip {
            clip_id: clip.clip_id.clone(),
            record,
            item_index,
            in_time,
            out_time,
            start_pkt,
            end_pkt,
            title_time,
            title_pkt,
        };
        title_time += nav.duration();
        title_pkt += nav.packet_count();
        clips.push(nav);
    }

    let angle_count = playlist
        .play_items
        .iter()
        .map(|item| item.angle_count())
        .max()
        .unwrap_or(1);
    let marks = project_marks(&playlist, &clips);
    debug!(
        playlist_id,
        angle,
        clips = clips.len(),
        marks = marks.len(),
        duration = title_time,
        "assembled title"
    );

    Ok(Title {
        playlist_id: playlist_id.to_string(),
        playlist,
        clips,
        marks,
        angle,
        angle_count,
        duration: title_time,
        packets: title_pkt,
    })
}

fn project_marks(playlist: &PlaylistRecord, clips: &[NavClip]) -> Vec<NavMark> {
    if clips.is_empty() {
        return Vec::new();
    }
    playlist
        .marks
        .iter()
        .map(|mark| {
            let clip_index = (mark.play_item_id as usize).min(clips.len() - 1);
            let clip = &clips[clip_index];
            let clip_time = mark.time as u64;
            let clip_pkt = clip.record.packet_for_timestamp(clip_time, true);
            NavMark {
                kind: mark.kind,
                clip_index,
                clip_time,
                clip_pkt,
                title_time: clip.title_time + clip_time.saturating_sub(clip.in_time),
                title_pkt: clip.title_pkt + clip_pkt.saturating_sub(clip.start_pkt),
                duration: mark.duration as u64,
            }
        })
        .collect()
}

impl Title {
    /// Entry marks, in playlist order.
    pub fn chapters(&self) -> impl Iterator<Item = &NavMark> {
        self.marks.iter().filter(|m| m.is_chapter())
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters().count()
    }

    /// Maps a title-timeline tick to a packet position.
    ///
    /// Ticks past the end resolve to the last clip's end; an empty title
    /// resolves to the zero point.
    pub fn time_search(&self, tick: u64) -> NavPoint {
        let Some(clip_index) = self.clip_index_at_time(tick) else {
            return NavPoint {
                clip_index: 0,
                clip_pkt: 0,
                title_pkt: 0,
                timestamp: 0,
            };
        };
        let clip = &self.clips[clip_index];
        let clip_tick = (clip.in_time + tick.saturating_sub(clip.title_time)).min(clip.out_time);
        let clip_pkt = clip.record.packet_for_timestamp(clip_tick, true);
        NavPoint {
            clip_index,
            clip_pkt,
            title_pkt: clip.title_pkt + clip_pkt.saturating_sub(clip.start_pkt),
            timestamp: clip_tick,
        }
    }

    /// Maps a title-timeline packet number to a clip position, with the
    /// timestamp of the nearest entry point at or before it.
    pub fn packet_search(&self, pkt: u32) -> NavPoint {
        let Some(clip_index) = self.clip_index_at_packet(pkt) else {
            return NavPoint {
                clip_index: 0,
                clip_pkt: 0,
                title_pkt: 0,
                timestamp: 0,
            };
        };
        let clip = &self.clips[clip_index];
        let clip_pkt = (clip.start_pkt + pkt.saturating_sub(clip.title_pkt)).min(clip.end_pkt);
        let ap = clip.record.timestamp_for_packet(clip_pkt, false, false);
        NavPoint {
            clip_index,
            clip_pkt,
            title_pkt: clip.title_pkt + clip_pkt.saturating_sub(clip.start_pkt),
            timestamp: ap.timestamp,
        }
    }

    /// Position of the `n`-th chapter (zero-based). Out-of-range chapters
    /// resolve to the start of the first clip.
    pub fn chapter_search(&self, n: usize) -> NavPoint {
        match self.chapters().nth(n) {
            Some(mark) => mark_point(mark),
            None => self.first_clip_point(),
        }
    }

    /// Position of the `n`-th mark of any kind (zero-based), clamping
    /// out-of-range indices to the start of the first clip.
    pub fn mark_search(&self, n: usize) -> NavPoint {
        match self.marks.get(n) {
            Some(mark) => mark_point(mark),
            None => self.first_clip_point(),
        }
    }

    /// Finds the next angle-change point at or after `pkt` within the clip
    /// at `clip_index`, where switching angles is safe.
    pub fn angle_change_search(&self, clip_index: usize, pkt: u32) -> AccessPoint {
        let clip_index = clip_index.min(self.clips.len().saturating_sub(1));
        match self.clips.get(clip_index) {
            Some(clip) => clip.record.timestamp_for_packet(pkt, true, true),
            None => AccessPoint {
                packet: 0,
                timestamp: 0,
            },
        }
    }

    fn clip_index_at_time(&self, tick: u64) -> Option<usize> {
        let last = self.clips.len().checked_sub(1)?;
        let idx = self
            .clips
            .iter()
            .position(|c| tick < c.title_time + c.duration())
            .unwrap_or(last);
        Some(idx)
    }

    fn clip_index_at_packet(&self, pkt: u32) -> Option<usize> {
        let last = self.clips.len().checked_sub(1)?;
        let idx = self
            .clips
            .iter()
            .position(|c| pkt < c.title_pkt + c.packet_count())
            .unwrap_or(last);
        Some(idx)
    }

    fn first_clip_point(&self) -> NavPoint {
        match self.clips.first() {
            Some(clip) => NavPoint {
                clip_index: 0,
                clip_pkt: clip.start_pkt,
                title_pkt: 0,
                timestamp: clip.in_time,
            },
            None => NavPoint {
                clip_index: 0,
                clip_pkt: 0,
                title_pkt: 0,
                timestamp: 0,
            },
        }
    }
}

fn mark_point(mark: &NavMark) -> NavPoint {
    NavPoint {
        clip_index: mark.clip_index,
        clip_pkt: mark.clip_pkt,
        title_pkt: mark.title_pkt,
        timestamp: mark.clip_time,
    }
}
