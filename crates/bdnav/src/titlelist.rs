use std::cmp::Ordering;

use mpls::{PlaylistRecord, VideoQuality};
use tracing::{debug, info};

use clpi::TICKS_PER_SECOND;

const THIRTY_MINUTES: u64 = 30 * 60 * TICKS_PER_SECOND;

/// Filters applied while enumerating playlists.
#[derive(Debug, Clone)]
pub struct TitleListOptions {
    /// Minimum total duration in 45 kHz ticks; shorter playlists are dropped.
    pub min_duration: u64,
    /// Drop playlists that are record-for-record identical to one already kept.
    pub filter_dup_title: bool,
    /// Drop playlists that repeat the same clip segment internally.
    pub filter_dup_clip: bool,
    /// How many times a `(clip id, in, out)` triple may recur before the
    /// playlist is considered filler.
    pub dup_clip_threshold: usize,
}

impl Default for TitleListOptions {
    fn default() -> Self {
        Self {
            min_duration: 0,
            filter_dup_title: true,
            filter_dup_clip: true,
            dup_clip_threshold: 2,
        }
    }
}

/// Per-playlist summary used for ranking, with the parsed record retained
/// for duplicate checks and later opening.
#[derive(Debug, Clone)]
pub struct TitleInfo {
    pub playlist_id: String,
    pub duration: u64,
    pub chapter_count: usize,
    pub audio_tracks: usize,
    pub subtitle_tracks: usize,
    pub video: VideoQuality,
    pub has_lossless_audio: bool,
    pub record: PlaylistRecord,
}

impl TitleInfo {
    pub fn new(playlist_id: &str, record: PlaylistRecord) -> Self {
        Self {
            playlist_id: playlist_id.to_string(),
            duration: record.duration(),
            chapter_count: record.chapter_count(),
            audio_tracks: record.audio_track_count(),
            subtitle_tracks: record.subtitle_track_count(),
            video: record.video_quality(),
            has_lossless_audio: record.has_lossless_audio(),
            record,
        }
    }

    fn track_score(&self) -> usize {
        self.audio_tracks * 2 + self.subtitle_tracks
    }
}

/// Record-for-record playlist equality: same item, sub-path and mark counts,
/// and every play item agrees on clip id, times and stream table.
pub fn is_duplicate_playlist(a: &PlaylistRecord, b: &PlaylistRecord) -> bool {
    if a.play_items.len() != b.play_items.len()
        || a.sub_paths.len() != b.sub_paths.len()
        || a.marks.len() != b.marks.len()
    {
        return false;
    }
    a.play_items.iter().zip(&b.play_items).all(|(x, y)| {
        x.angles == y.angles
            && x.in_time == y.in_time
            && x.out_time == y.out_time
            && x.stn == y.stn
    })
}

/// True when some `(clip id, in, out)` segment recurs more than `threshold`
/// times, which marks looping filler content rather than a feature.
pub fn has_repeated_clips(record: &PlaylistRecord, threshold: usize) -> bool {
    let segments: Vec<(&str, u32, u32)> = record
        .play_items
        .iter()
        .filter_map(|item| {
            item.angles
                .first()
                .map(|a| (a.clip_id.as_str(), item.in_time, item.out_time))
        })
        .collect();
    segments
        .iter()
        .any(|seg| segments.iter().filter(|s| *s == seg).count() > threshold)
}

/// Orders two candidates; `Greater` means `a` is the better main-title pick.
///
/// The first applicable rule decides:
/// 1. both over 30 minutes, chapter counts more than 5 apart and at least
///    one side below 2 chapters: more chapters wins
/// 2. higher video quality (resolution, then codec tier)
/// 3. lossless audio present
/// 4. id appears in the known-good hint string
/// 5. longer duration
/// 6. higher track score (audio counts double)
pub fn compare_candidates(a: &TitleInfo, b: &TitleInfo, hint: Option<&str>) -> Ordering {
    if a.duration > THIRTY_MINUTES && b.duration > THIRTY_MINUTES {
        let (ca, cb) = (a.chapter_count, b.chapter_count);
        if ca.abs_diff(cb) > 5 && ca.min(cb) < 2 {
            return ca.cmp(&cb);
        }
    }

    let by_video = a.video.cmp(&b.video);
    if by_video != Ordering::Equal {
        return by_video;
    }

    let by_lossless = a.has_lossless_audio.cmp(&b.has_lossless_audio);
    if by_lossless != Ordering::Equal {
        return by_lossless;
    }

    // The hint match is a plain substring test on the printed id, which can
    // false-positive on short numeric ids; kept for compatibility.
    if let Some(hint) = hint {
        let by_hint = hint.contains(&a.playlist_id).cmp(&hint.contains(&b.playlist_id));
        if by_hint != Ordering::Equal {
            return by_hint;
        }
    }

    let by_duration = a.duration.cmp(&b.duration);
    if by_duration != Ordering::Equal {
        return by_duration;
    }

    a.track_score().cmp(&b.track_score())
}

/// Applies the option filters to `candidate` against already-kept titles.
/// Returns `false` with a log line when the candidate is dropped.
pub(crate) fn passes_filters(
    candidate: &TitleInfo,
    kept: &[TitleInfo],
    options: &TitleListOptions,
) -> bool {
    if candidate.duration < options.min_duration {
        debug!(
            playlist_id = candidate.playlist_id,
            duration = candidate.duration,
            "dropped: below minimum duration"
        );
        return false;
    }
    if options.filter_dup_clip && has_repeated_clips(&candidate.record, options.dup_clip_threshold)
    {
        info!(
            playlist_id = candidate.playlist_id,
            "dropped: repeated clip segments"
        );
        return false;
    }
    if options.filter_dup_title
        && kept
            .iter()
            .any(|k| is_duplicate_playlist(&k.record, &candidate.record))
    {
        info!(
            playlist_id = candidate.playlist_id,
            "dropped: duplicate of an already-kept playlist"
        );
        return false;
    }
    true
}

/// Picks the best candidate under [`compare_candidates`]; ties keep the
/// earlier-seen entry.
pub fn select_main<'a>(candidates: &'a [TitleInfo], hint: Option<&str>) -> Option<&'a TitleInfo> {
    let mut best: Option<&TitleInfo> = None;
    for candidate in candidates {
        match best {
            None => best = Some(candidate),
            Some(current) => {
                if compare_candidates(candidate, current, hint) == Ordering::Greater {
                    best = Some(candidate);
                }
            }
        }
    }
    best
}
