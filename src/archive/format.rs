use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::ArchiveError;
use crate::media::library::MediaEntry;

/// Container format of the downloadable archive. Chosen per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// Deflate-compressed ZIP.
    #[default]
    Zip,
    /// Uncompressed TAR.
    Tar,
}

/// Outcome of writing one archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub written: usize,
    pub skipped: usize,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
        }
    }

    /// Upper-case name shown in the gallery UI.
    pub fn label(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "ZIP",
            ArchiveFormat::Tar => "TAR",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "application/zip",
            ArchiveFormat::Tar => "application/x-tar",
        }
    }

    /// Fixed filename offered in `Content-Disposition`.
    pub fn download_filename(self) -> String {
        format!("comfyui_preview_gallery.{}", self.extension())
    }

    /// Write every entry into `file` under its relative path.
    ///
    /// An entry that cannot be read is logged and skipped; only failures of the
    /// container itself (central directory, final flush) abort the build. `cancel`
    /// is polled between entries.
    pub(crate) fn write_entries(
        self,
        file: File,
        entries: &[MediaEntry],
        cancel: &AtomicBool,
    ) -> Result<BuildReport, ArchiveError> {
        match self {
            ArchiveFormat::Zip => write_zip(file, entries, cancel),
            ArchiveFormat::Tar => write_tar(file, entries, cancel),
        }
    }
}

fn write_zip(
    file: File,
    entries: &[MediaEntry],
    cancel: &AtomicBool,
) -> Result<BuildReport, ArchiveError> {
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let mut report = BuildReport::default();

    for entry in entries {
        check_cancelled(cancel)?;
        match append_zip_entry(&mut zip, entry) {
            Ok(()) => report.written += 1,
            Err(e) => {
                tracing::warn!("Skipping {} in archive: {}", entry.relative_path, e);
                report.skipped += 1;
            }
        }
    }

    let out = zip.finish()?;
    truncate_at_position(out)?;
    Ok(report)
}

fn append_zip_entry(
    zip: &mut ZipWriter<BufWriter<File>>,
    entry: &MediaEntry,
) -> Result<(), ArchiveError> {
    // Open before start_file so an unreadable source leaves no dangling header.
    let mut source = File::open(&entry.absolute_path)?;
    let size = source.metadata()?.len();

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size >= u64::from(u32::MAX));
    zip.start_file(entry.relative_path.as_str(), options)?;

    // A read that fails partway must not leave a truncated member behind.
    if let Err(e) = io::copy(&mut source, zip) {
        zip.abort_file()?;
        return Err(e.into());
    }
    Ok(())
}

fn write_tar(
    file: File,
    entries: &[MediaEntry],
    cancel: &AtomicBool,
) -> Result<BuildReport, ArchiveError> {
    let mut builder = tar::Builder::new(BufWriter::new(file));
    let mut report = BuildReport::default();

    for entry in entries {
        check_cancelled(cancel)?;
        let start = builder.get_mut().stream_position()?;
        match append_tar_entry(&mut builder, entry) {
            Ok(()) => report.written += 1,
            Err(e) => {
                rewind(builder.get_mut(), start)?;
                tracing::warn!("Skipping {} in archive: {}", entry.relative_path, e);
                report.skipped += 1;
            }
        }
    }

    let out = builder.into_inner()?;
    truncate_at_position(out)?;
    Ok(report)
}

fn append_tar_entry(
    builder: &mut tar::Builder<BufWriter<File>>,
    entry: &MediaEntry,
) -> io::Result<()> {
    let mut source = File::open(&entry.absolute_path)?;
    builder.append_file(&entry.relative_path, &mut source)
}

/// Drop everything written after `pos`, e.g. a header whose data never arrived.
fn rewind(out: &mut BufWriter<File>, pos: u64) -> io::Result<()> {
    out.seek(SeekFrom::Start(pos))?;
    out.get_ref().set_len(pos)
}

/// Flush and cut the file at the writer's position. A rolled-back entry can
/// leave stale bytes past the real end of the container.
fn truncate_at_position(mut out: BufWriter<File>) -> io::Result<()> {
    let end = out.stream_position()?;
    out.flush()?;
    out.get_ref().set_len(end)
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), ArchiveError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(ArchiveError::Cancelled);
    }
    Ok(())
}
