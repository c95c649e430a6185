use std::path::PathBuf;
use std::time::Instant;

use crate::media::mime::MediaKind;

/// A single indexed media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    /// Absolute path on disk, used when copying the file into an archive.
    pub absolute_path: PathBuf,
    /// Path relative to the output root, always `/`-separated. Doubles as the
    /// archive entry name and the URL path served by the static fallback.
    pub relative_path: String,
    pub kind: MediaKind,
}

/// Immutable point-in-time listing of the output root, newest file first.
///
/// Shared as `Arc<IndexSnapshot>` and replaced wholesale on refresh.
#[derive(Debug)]
pub struct IndexSnapshot {
    pub entries: Vec<MediaEntry>,
    pub captured_at: Instant,
}

impl IndexSnapshot {
    pub fn new(entries: Vec<MediaEntry>) -> Self {
        Self {
            entries,
            captured_at: Instant::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
