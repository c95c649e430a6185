use std::sync::Arc;

use crate::archive::ArchiveBuilder;
use crate::config::Config;
use crate::media::index::MediaIndex;
use crate::media::library::IndexSnapshot;

/// Shared application state injected into all route handlers via axum::extract::State.
/// One instance per server; clones share the same index cache and archive state.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<MediaIndex>,
    pub archive: ArchiveBuilder,
    /// Items per gallery page; 0 shows everything.
    pub page_size: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            index: Arc::new(MediaIndex::new(&config.root)),
            archive: ArchiveBuilder::new(config.archive_format, &config.archive_dir),
            page_size: config.page_size,
        }
    }

    /// Current index snapshot. A stale cache means a full directory walk, which
    /// runs on the blocking pool rather than an async worker.
    pub async fn snapshot(&self) -> Arc<IndexSnapshot> {
        let index = Arc::clone(&self.index);
        match tokio::task::spawn_blocking(move || index.snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Media index task failed: {}", e);
                Arc::new(IndexSnapshot::empty())
            }
        }
    }
}
