use std::fs;
use std::io::{self, Read, Seek};
use std::path::PathBuf;

use bytes::Bytes;
use tracing::debug;

/// Playlist directory inside a BDMV tree, relative to the disc root.
pub const PLAYLIST_DIR: &str = "BDMV/PLAYLIST";
/// Clip-information directory inside a BDMV tree.
pub const CLIPINF_DIR: &str = "BDMV/CLIPINF";
/// Backup copy of the playlist directory, tried when the primary fails.
pub const BACKUP_PLAYLIST_DIR: &str = "BDMV/BACKUP/PLAYLIST";
/// Backup copy of the clip-information directory.
pub const BACKUP_CLIPINF_DIR: &str = "BDMV/BACKUP/CLIPINF";

/// Property key whose value lists playlist ids known to be the feature title.
pub const KNOWN_GOOD_PLAYLISTS: &str = "known_good_playlists";

/// Sequential, seekable byte access to one file.
pub trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

/// Read access to a disc image or directory tree.
///
/// Paths are always `/`-separated and relative to the disc root, e.g.
/// `BDMV/PLAYLIST/00001.mpls`. A missing file is a normal failure; the
/// caller retries the backup directory.
pub trait ByteSource: Send + Sync {
    /// Opens a file for sequential, seekable reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn SeekRead>>;

    /// Size of a file in bytes.
    fn size(&self, path: &str) -> io::Result<u64>;

    /// Lists the file names (not full paths) inside a directory.
    fn list_dir(&self, path: &str) -> io::Result<Vec<String>>;

    /// Reads an entire file into memory.
    fn read_file(&self, path: &str) -> io::Result<Bytes> {
        let mut reader = self.open(path)?;
        let mut buf = match self.size(path) {
            Ok(size) => Vec::with_capacity(size as usize),
            Err(_) => Vec::new(),
        };
        reader.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

/// External per-disc settings, keyed by string.
pub trait PropertyStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// A [`ByteSource`] over a local directory.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for part in path.split('/') {
            full.push(part);
        }
        full
    }
}

impl ByteSource for DirSource {
    fn open(&self, path: &str) -> io::Result<Box<dyn SeekRead>> {
        let full = self.resolve(path);
        debug!(path = %full.display(), "opening file");
        Ok(Box::new(fs::File::open(full)?))
    }

    fn size(&self, path: &str) -> io::Result<u64> {
        Ok(fs::metadata(self.resolve(path))?.len())
    }

    fn read_file(&self, path: &str) -> io::Result<Bytes> {
        Ok(Bytes::from(fs::read(self.resolve(path))?))
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let full = self.resolve(path);
        let mut names = Vec::new();
        for entry in fs::read_dir(full)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

pub(crate) fn playlist_path(dir: &str, playlist_id: &str) -> String {
    format!("{dir}/{playlist_id}.mpls")
}

pub(crate) fn clipinf_path(dir: &str, clip_id: &str) -> String {
    format!("{dir}/{clip_id}.clpi")
}
