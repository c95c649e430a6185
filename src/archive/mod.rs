//! Single-flight background archive builder.
//!
//! One `ArchiveBuilder` owns the published archive file. Builds run on their own
//! OS thread so HTTP handlers never wait on them; a build requested while another
//! is running is dropped, not queued.

pub mod format;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

pub use format::{ArchiveFormat, BuildReport};

use crate::media::library::MediaEntry;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to keep temporary archive: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("archive build cancelled")]
    Cancelled,
}

/// Mutable archive state. Both fields are only touched under the builder's lock.
#[derive(Debug, Default)]
pub struct ArchiveState {
    /// Last completed archive. Never points at a file that is still being written.
    pub path: Option<PathBuf>,
    pub generating: bool,
}

/// What the gallery should offer, decided from one consistent read of the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    Ready(PathBuf),
    Generating,
    Idle,
}

#[derive(Debug)]
struct Shared {
    format: ArchiveFormat,
    dir: PathBuf,
    state: Mutex<ArchiveState>,
    /// Signalled whenever `generating` drops back to false.
    idle: Condvar,
    /// Set once by `shutdown`; no build is accepted or published afterwards.
    closed: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ArchiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = state.path.take() {
            remove_archive(&path);
        }
    }
}

/// Clears `generating` when the build thread finishes, including by panic.
struct GeneratingGuard<'a>(&'a Shared);

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().generating = false;
        self.0.idle.notify_all();
    }
}

/// Cheap-to-clone handle to the process-wide archive state.
///
/// The published archive file is deleted when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    shared: Arc<Shared>,
}

impl ArchiveBuilder {
    /// `dir` is where temporary archives are created; it must exist.
    pub fn new(format: ArchiveFormat, dir: impl Into<PathBuf>) -> Self {
        Self {
            shared: Arc::new(Shared {
                format,
                dir: dir.into(),
                state: Mutex::new(ArchiveState::default()),
                idle: Condvar::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        self.shared.format
    }

    /// Start a background build of `entries` unless one is already running.
    ///
    /// Returns the build thread's handle when the request was accepted and `None`
    /// when it was dropped. Dropping the handle detaches the build.
    pub fn request_build(&self, entries: Vec<MediaEntry>) -> Option<JoinHandle<()>> {
        {
            let mut state = self.shared.lock();
            if self.shared.closed.load(Ordering::SeqCst) {
                tracing::debug!("Archive builder shut down; request dropped");
                return None;
            }
            if state.generating {
                tracing::debug!("Archive build already running; request dropped");
                return None;
            }
            state.generating = true;
        }

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("archive-builder".to_string())
            .spawn(move || {
                let _guard = GeneratingGuard(&shared);
                run_build(&shared, &entries);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to spawn archive builder thread: {}", e);
                self.shared.lock().generating = false;
                self.shared.idle.notify_all();
                None
            }
        }
    }

    /// Delete the current archive, if any, so the next request starts fresh.
    pub fn clear_build(&self) {
        let previous = self.shared.lock().path.take();
        if let Some(path) = previous {
            tracing::info!("Archive cleared: {}", path.display());
            remove_archive(&path);
        }
    }

    /// Read `path` and `generating` together. A published file that has vanished
    /// from disk is not reported as ready.
    pub fn status(&self) -> ArchiveStatus {
        let state = self.shared.lock();
        match &state.path {
            Some(path) if path.is_file() => ArchiveStatus::Ready(path.clone()),
            _ if state.generating => ArchiveStatus::Generating,
            _ => ArchiveStatus::Idle,
        }
    }

    pub fn ready_path(&self) -> Option<PathBuf> {
        match self.status() {
            ArchiveStatus::Ready(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.shared.lock().generating
    }

    /// Refuse new builds, cancel a running one, wait for its thread to let go of
    /// the output file, then delete whatever was published.
    ///
    /// Called when the server stops, since a detached build thread would
    /// otherwise keep the state alive past process exit.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        self.shared.closed.store(true, Ordering::SeqCst);
        while state.generating {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let previous = state.path.take();
        drop(state);
        if let Some(path) = previous {
            remove_archive(&path);
        }
    }
}

fn run_build(shared: &Shared, entries: &[MediaEntry]) {
    // Retire the previous archive first; readers see `Generating` until the new
    // one is published.
    let previous = shared.lock().path.take();
    if let Some(path) = previous {
        remove_archive(&path);
    }

    if entries.is_empty() {
        tracing::info!("No media files to archive");
        return;
    }

    tracing::info!(
        "Building {} archive of {} files",
        shared.format.label(),
        entries.len()
    );

    match write_archive(shared.format, &shared.dir, entries, &shared.closed) {
        Ok((path, report)) => {
            let mut state = shared.lock();
            if shared.closed.load(Ordering::SeqCst) {
                drop(state);
                remove_archive(&path);
                return;
            }
            tracing::info!(
                "Archive ready: {} ({} written, {} skipped)",
                path.display(),
                report.written,
                report.skipped
            );
            state.path = Some(path);
        }
        Err(ArchiveError::Cancelled) => {
            tracing::info!("Archive build cancelled");
        }
        Err(e) => {
            tracing::error!("Archive build failed: {}", e);
        }
    }
}

fn write_archive(
    format: ArchiveFormat,
    dir: &Path,
    entries: &[MediaEntry],
    cancel: &AtomicBool,
) -> Result<(PathBuf, BuildReport), ArchiveError> {
    let suffix = format!(".{}", format.extension());
    let (file, path) = tempfile::Builder::new()
        .prefix("preview-gallery-")
        .suffix(&suffix)
        .tempfile_in(dir)?
        .keep()?;

    match format.write_entries(file, entries, cancel) {
        Ok(report) => Ok((path, report)),
        Err(e) => {
            remove_archive(&path);
            Err(e)
        }
    }
}

/// Best-effort delete; a failure is logged, never propagated.
fn remove_archive(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed archive {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove archive {}: {}", path.display(), e),
    }
}
