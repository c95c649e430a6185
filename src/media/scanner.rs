use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use crate::media::library::{IndexSnapshot, MediaEntry};
use crate::media::mime::classify;

/// Walk `root` and return every allow-listed file, newest first.
///
/// Symlinks are followed. Unreadable entries log warn and are skipped; a missing
/// or unreadable root yields an empty snapshot rather than an error.
pub fn scan(root: &Path) -> IndexSnapshot {
    let start = Instant::now();

    if !root.is_dir() {
        tracing::warn!("Output root is not a readable directory: {}", root.display());
        return IndexSnapshot::empty();
    }

    let mut found: Vec<(SystemTime, MediaEntry)> = Vec::new();

    // Sorting by file name keeps the walk order (and so tie order) deterministic.
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        match entry {
            Err(e) => {
                tracing::warn!("Cannot access entry: {}", e);
            }
            Ok(entry) if entry.file_type().is_file() => {
                if let Some(item) = process_file(root, entry.path()) {
                    found.push(item);
                }
            }
            Ok(_) => {}
        }
    }

    // Stable sort: equal timestamps keep walk order.
    found.sort_by(|(a, _), (b, _)| b.cmp(a));
    let entries: Vec<MediaEntry> = found.into_iter().map(|(_, entry)| entry).collect();

    tracing::debug!(
        "Indexed {} media files under {} in {:.1}s",
        entries.len(),
        root.display(),
        start.elapsed().as_secs_f64()
    );

    IndexSnapshot::new(entries)
}

fn process_file(root: &Path, path: &Path) -> Option<(SystemTime, MediaEntry)> {
    let (kind, _mime) = classify(path)?;

    let relative = path.strip_prefix(root).ok()?;
    let relative_path = relative_url_path(relative)?;

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::path::absolute(path) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Cannot resolve {}: {}", path.display(), e);
                return None;
            }
        }
    };

    Some((
        created_at(path),
        MediaEntry {
            absolute_path,
            relative_path,
            kind,
        },
    ))
}

/// Creation time. Filesystems without birth times fall back to the modification
/// time; the epoch is used only when the file cannot be stat'ed at all.
fn created_at(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .unwrap_or(UNIX_EPOCH)
}

/// Join path components with `/` so the result is usable both as a URL path and as
/// an archive entry name. Non UTF-8 names are skipped.
fn relative_url_path(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
