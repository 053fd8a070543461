use std::collections::HashMap;
use std::sync::Arc;

use clpi::ClipRecord;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::source::{clipinf_path, ByteSource, BACKUP_CLIPINF_DIR, CLIPINF_DIR};

/// Parsed clip records shared across titles, keyed by clip id.
///
/// A clip is typically referenced by several playlists; parsing it once and
/// handing out `Arc`s keeps title assembly cheap. The lock only guards the
/// map itself, parsing happens outside it.
#[derive(Default)]
pub struct ClipCache {
    map: Mutex<HashMap<String, Arc<ClipRecord>>>,
}

impl ClipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, clip_id: &str) -> Option<Arc<ClipRecord>> {
        self.map.lock().get(clip_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    pub fn clear(&self) {
        self.map.lock().clear();
    }

    /// Returns the cached record for `clip_id`, loading and parsing it from
    /// `source` on a miss. The primary CLIPINF directory is tried first and
    /// the backup copy on any read or parse failure. If two threads race on
    /// the same miss, the first insert wins and both get the same `Arc`.
    pub fn get_or_load(&self, source: &dyn ByteSource, clip_id: &str) -> Result<Arc<ClipRecord>> {
        if let Some(record) = self.get(clip_id) {
            debug!(clip_id, "clip cache hit");
            return Ok(record);
        }

        let record = load_clip(source, clip_id)?;
        let record = self
            .map
            .lock()
            .entry(clip_id.to_string())
            .or_insert_with(|| Arc::new(record))
            .clone();
        Ok(record)
    }
}

fn load_clip(source: &dyn ByteSource, clip_id: &str) -> Result<ClipRecord> {
    match try_load(source, CLIPINF_DIR, clip_id) {
        Ok(record) => Ok(record),
        Err(err) => {
            warn!(clip_id, %err, "primary clip load failed, trying backup");
            try_load(source, BACKUP_CLIPINF_DIR, clip_id)
        }
    }
}

fn try_load(source: &dyn ByteSource, dir: &str, clip_id: &str) -> Result<ClipRecord> {
    let path = clipinf_path(dir, clip_id);
    let data = source.read_file(&path)?;
    let record = clpi::parse_clip(data)?;
    debug!(clip_id, path, "loaded clip");
    Ok(record)
}
