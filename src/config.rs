use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveFormat;

const DEFAULT_PORT: u16 = 8888;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_ROOT: &str = "/workspace/output";

#[derive(Deserialize, Default, Debug)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub page_size: Option<usize>,
    pub enabled: Option<bool>,
    pub root: Option<PathBuf>,
    pub archive_format: Option<ArchiveFormat>,
    pub archive_dir: Option<PathBuf>,
    pub localhost: Option<bool>,
}

/// Settings resolved once at startup and passed down; nothing here changes while
/// the server runs.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Items per gallery page; 0 means a single unpaginated page.
    pub page_size: usize,
    /// Whether the server starts when the host loads this module. Off unless
    /// explicitly enabled.
    pub enabled: bool,
    pub root: PathBuf,
    pub archive_format: ArchiveFormat,
    pub archive_dir: PathBuf,
    pub localhost: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            page_size: DEFAULT_PAGE_SIZE,
            enabled: false,
            root: PathBuf::from(DEFAULT_ROOT),
            archive_format: ArchiveFormat::default(),
            archive_dir: std::env::temp_dir(),
            localhost: false,
        }
    }
}

impl Config {
    /// CLI flags and environment variables win over the file, the file wins over
    /// the defaults.
    pub fn resolve(file: Option<FileConfig>, args: &crate::cli::Args) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Config::default();
        Config {
            port: args.port.or(file.port).unwrap_or(defaults.port),
            page_size: args.page_size.or(file.page_size).unwrap_or(defaults.page_size),
            enabled: args.enabled.or(file.enabled).unwrap_or(defaults.enabled),
            root: args.root.clone().or(file.root).unwrap_or(defaults.root),
            archive_format: args
                .archive_format
                .or(file.archive_format)
                .unwrap_or(defaults.archive_format),
            archive_dir: args
                .archive_dir
                .clone()
                .or(file.archive_dir)
                .unwrap_or(defaults.archive_dir),
            localhost: args.localhost || file.localhost.unwrap_or(defaults.localhost),
        }
    }
}

pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }
    let cwd_config = PathBuf::from("preview-gallery.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("preview-gallery").join("config.toml");
        if user_config.exists() {
            return Some(user_config);
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}
