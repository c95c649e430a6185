use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::media::library::IndexSnapshot;
use crate::media::scanner::scan;

/// How long a snapshot is served before the next read re-walks the root.
pub const DEFAULT_INDEX_TTL: Duration = Duration::from_secs(60);

/// Process-wide, lazily refreshed cache of the output root listing.
///
/// There is no refresh thread: the first read after the TTL expires performs the
/// walk. The lock is held across that walk, so concurrent stale readers wait for
/// the one refresh instead of each walking the tree.
#[derive(Debug)]
pub struct MediaIndex {
    root: PathBuf,
    ttl: Duration,
    cached: Mutex<Option<Arc<IndexSnapshot>>>,
}

impl MediaIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_ttl(root, DEFAULT_INDEX_TTL)
    }

    pub fn with_ttl(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current snapshot. Blocks on a full directory walk when the cache is stale,
    /// so async callers should run this under `spawn_blocking`.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(snapshot) = cached.as_ref() {
            if snapshot.captured_at.elapsed() < self.ttl {
                return Arc::clone(snapshot);
            }
        }

        let fresh = Arc::new(scan(&self.root));
        tracing::debug!(
            "Refreshed media index: {} entries under {}",
            fresh.len(),
            self.root.display()
        );
        *cached = Some(Arc::clone(&fresh));
        fresh
    }
}
