use clap::Parser;
use std::path::PathBuf;

use crate::archive::ArchiveFormat;

/// Environment switch that hosts already set to turn the gallery on.
pub const ENABLE_ENV: &str = "ENABLED_COMFYUI_PREVIEW_GALLERY";

/// Anything other than `true` (any case) leaves the gallery off; never an error.
pub fn parse_enable_flag(value: &str) -> Result<bool, std::convert::Infallible> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

#[derive(Parser, Debug)]
#[command(
    name = "preview-gallery",
    about = "Local media preview gallery with on-demand ZIP/TAR downloads",
    long_about = None,
    version,
)]
pub struct Args {
    /// Output directory to index and serve [default: /workspace/output]
    #[arg(env = "COMFYUI_PREVIEW_GALLERY_ROOT")]
    pub root: Option<PathBuf>,

    /// HTTP port to listen on [default: 8888]
    #[arg(short, long, env = "COMFYUI_PREVIEW_GALLERY_PORT")]
    pub port: Option<u16>,

    /// Items per gallery page, 0 shows everything on one page [default: 10]
    #[arg(long, env = "COMFYUI_PREVIEW_GALLERY_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Start the server; only the value `true` enables it [default: false]
    #[arg(long, env = ENABLE_ENV, value_name = "BOOL", value_parser = parse_enable_flag)]
    pub enabled: Option<bool>,

    /// Archive format offered for download [default: zip]
    #[arg(long, value_enum, env = "COMFYUI_PREVIEW_GALLERY_ARCHIVE_FORMAT")]
    pub archive_format: Option<ArchiveFormat>,

    /// Directory for temporary archives [default: system temp dir]
    #[arg(long, value_name = "DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Path to TOML config file (overrides default search: ./preview-gallery.toml, ~/.config/preview-gallery/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bind to localhost only (127.0.0.1) instead of all interfaces (0.0.0.0)
    #[arg(long)]
    pub localhost: bool,
}
