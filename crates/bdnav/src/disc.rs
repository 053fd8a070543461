use mpls::PlaylistRecord;
use tracing::{info, warn};

use crate::cache::ClipCache;
use crate::error::{NavError, Result};
use crate::source::{
    playlist_path, ByteSource, PropertyStore, BACKUP_PLAYLIST_DIR, KNOWN_GOOD_PLAYLISTS,
    PLAYLIST_DIR,
};
use crate::title::{self, Title, MAX_ANGLES};
use crate::titlelist::{passes_filters, select_main, TitleInfo, TitleListOptions};

/// One navigation session over a disc: a byte source, an optional property
/// store, and the clip cache shared by every title opened through it.
pub struct Disc {
    source: Box<dyn ByteSource>,
    properties: Option<Box<dyn PropertyStore>>,
    cache: ClipCache,
}

impl Disc {
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        Self {
            source,
            properties: None,
            cache: ClipCache::new(),
        }
    }

    pub fn with_properties(mut self, properties: Box<dyn PropertyStore>) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn cache(&self) -> &ClipCache {
        &self.cache
    }

    /// Opens `playlist_id` as a navigable title at the given angle.
    ///
    /// Any failure to parse the playlist or one of its clips collapses into
    /// [`NavError::NoTitle`]; the underlying cause is logged.
    pub fn open_title(&self, playlist_id: &str, angle: u8) -> Result<Title> {
        let angle = if angle >= MAX_ANGLES { 0 } else { angle };
        let playlist = self.load_playlist(playlist_id).map_err(|err| {
            warn!(playlist_id, %err, "playlist load failed");
            NavError::NoTitle {
                playlist_id: playlist_id.to_string(),
            }
        })?;
        self.assemble(playlist_id, playlist, angle)
    }

    /// Re-resolves the title's clips for a new angle, in place. Unchanged or
    /// out-of-range angles are ignored.
    pub fn set_angle(&self, title: &mut Title, angle: u8) -> Result<()> {
        if angle == title.angle {
            return Ok(());
        }
        if angle >= MAX_ANGLES {
            warn!(angle, "angle out of range, ignoring");
            return Ok(());
        }
        let rebuilt = self.assemble(&title.playlist_id, title.playlist.clone(), angle)?;
        *title = rebuilt;
        Ok(())
    }

    /// Enumerates every playlist on the disc, applying the option filters.
    /// Unreadable or unparseable playlists are skipped, not fatal.
    pub fn list_titles(&self, options: &TitleListOptions) -> Vec<TitleInfo> {
        let mut ids = self.playlist_ids();
        ids.sort();
        let mut kept: Vec<TitleInfo> = Vec::new();
        for id in ids {
            let record = match self.load_playlist(&id) {
                Ok(record) => record,
                Err(err) => {
                    info!(playlist_id = id, %err, "skipping unreadable playlist");
                    continue;
                }
            };
            let candidate = TitleInfo::new(&id, record);
            if passes_filters(&candidate, &kept, options) {
                kept.push(candidate);
            }
        }
        kept
    }

    /// Ranks the surviving playlists and returns the presumed feature title.
    pub fn main_title(&self, options: &TitleListOptions) -> Option<TitleInfo> {
        let candidates = self.list_titles(options);
        let hint = self
            .properties
            .as_ref()
            .and_then(|p| p.get(KNOWN_GOOD_PLAYLISTS));
        let best = select_main(&candidates, hint.as_deref())?;
        info!(playlist_id = best.playlist_id, "selected main title");
        Some(best.clone())
    }

    fn assemble(&self, playlist_id: &str, playlist: PlaylistRecord, angle: u8) -> Result<Title> {
        let mut resolve =
            |clip_id: &str| self.cache.get_or_load(self.source.as_ref(), clip_id);
        title::assemble(playlist_id, playlist, angle, &mut resolve).map_err(|err| {
            warn!(playlist_id, %err, "title assembly failed");
            NavError::NoTitle {
                playlist_id: playlist_id.to_string(),
            }
        })
    }

    fn load_playlist(&self, playlist_id: &str) -> Result<PlaylistRecord> {
        match self.try_load_playlist(PLAYLIST_DIR, playlist_id) {
            Ok(record) => Ok(record),
            Err(err) => {
                warn!(playlist_id, %err, "primary playlist load failed, trying backup");
                self.try_load_playlist(BACKUP_PLAYLIST_DIR, playlist_id)
            }
        }
    }

    fn try_load_playlist(&self, dir: &str, playlist_id: &str) -> Result<PlaylistRecord> {
        let data = self.source.read_file(&playlist_path(dir, playlist_id))?;
        Ok(mpls::parse_playlist(data)?)
    }

    fn playlist_ids(&self) -> Vec<String> {
        let names = match self.source.list_dir(PLAYLIST_DIR) {
            Ok(names) => names,
            Err(err) => {
                warn!(%err, "playlist directory unreadable, listing backup");
                self.source.list_dir(BACKUP_PLAYLIST_DIR).unwrap_or_default()
            }
        };
        names
            .into_iter()
            .filter_map(|name| {
                let stem = name
                    .strip_suffix(".mpls")
                    .or_else(|| name.strip_suffix(".MPLS"))?;
                Some(stem.to_string())
            })
            .collect()
    }
}
