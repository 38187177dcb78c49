use crate::model::ConfigSnapshot;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_ENV: &str = "NOMADNET_RELEASES_CONFIG";
pub const RELEASES_FILE: &str = "releases.json";
pub const COUNTS_FILE: &str = "download_counts.json";
pub const ASCII_ART_TARGET: &str = "ascii-art.txt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("github_repo must look like owner/name, got {0:?}")]
    InvalidRepo(String),
    #[error("invalid asset_pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("max_releases must be at least 1")]
    ZeroMaxReleases,
    #[error("cannot determine home directory; set nomadnet_dir in the config")]
    NoHomeDir,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_app_name")]
    app_name: String,
    #[serde(default)]
    app_description: String,
    #[serde(default)]
    page_title: Option<String>,
    github_repo: String,
    asset_pattern: String,
    #[serde(default = "default_max_releases")]
    max_releases: usize,
    #[serde(default = "default_sync_interval")]
    sync_interval_hours: u32,
    #[serde(default)]
    ascii_art_file: Option<String>,
    #[serde(default)]
    ascii_bg_color: Option<String>,
    #[serde(default)]
    nomadnet_dir: Option<PathBuf>,
}

fn default_app_name() -> String {
    "App".to_string()
}

fn default_max_releases() -> usize {
    10
}

fn default_sync_interval() -> u32 {
    6
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub app_description: String,
    pub page_title: String,
    pub github_repo: String,
    pub asset_pattern: glob::Pattern,
    pub max_releases: usize,
    pub sync_interval_hours: u32,
    /// Resolved against the config file's directory.
    pub ascii_art_file: Option<PathBuf>,
    pub ascii_bg_color: Option<String>,
    pub nomadnet_dir: Option<PathBuf>,
}

impl Config {
    /// `--config` wins, then `NOMADNET_RELEASES_CONFIG`, then `./config.json`.
    pub fn resolve_path(cli: Option<&Path>) -> PathBuf {
        if let Some(path) = cli {
            return path.to_path_buf();
        }
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parses config text. Relative paths resolve against `path`'s directory.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_raw(raw, base)
    }

    fn from_raw(raw: RawConfig, base_dir: &Path) -> Result<Self, ConfigError> {
        let repo = raw.github_repo.trim();
        let mut parts = repo.splitn(2, '/');
        let owner = parts.next().unwrap_or("");
        let name = parts.next().unwrap_or("");
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ConfigError::InvalidRepo(raw.github_repo));
        }

        let asset_pattern = glob::Pattern::new(&raw.asset_pattern).map_err(|source| {
            ConfigError::InvalidPattern {
                pattern: raw.asset_pattern.clone(),
                source,
            }
        })?;

        if raw.max_releases == 0 {
            return Err(ConfigError::ZeroMaxReleases);
        }

        let ascii_bg_color = match raw.ascii_bg_color {
            Some(color) if is_hex_color(&color) => Some(color.to_ascii_lowercase()),
            Some(color) => {
                warn!("ignoring ascii_bg_color {color:?}: expected 3 hex digits");
                None
            }
            None => None,
        };

        let page_title = raw
            .page_title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("{} Downloads", raw.app_name));

        Ok(Self {
            page_title,
            app_name: raw.app_name,
            app_description: raw.app_description,
            github_repo: repo.to_string(),
            asset_pattern,
            max_releases: raw.max_releases,
            sync_interval_hours: raw.sync_interval_hours,
            ascii_art_file: raw
                .ascii_art_file
                .filter(|f| !f.is_empty())
                .map(|f| base_dir.join(f)),
            ascii_bg_color,
            nomadnet_dir: raw.nomadnet_dir,
        })
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            app_name: self.app_name.clone(),
            app_description: self.app_description.clone(),
            page_title: self.page_title.clone(),
            asset_pattern: self.asset_pattern.as_str().to_string(),
            max_releases: self.max_releases,
            ascii_art_file: self
                .ascii_art_file
                .as_ref()
                .map(|_| ASCII_ART_TARGET.to_string()),
            ascii_bg_color: self.ascii_bg_color.clone(),
        }
    }

    pub fn paths(&self) -> Result<Paths, ConfigError> {
        let base = match &self.nomadnet_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(".nomadnetwork"),
        };
        Ok(Paths::new(&base))
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 3 && color.chars().all(|c| c.is_ascii_hexdigit())
}

/// Directory layout of the NomadNet node.
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub files_dir: PathBuf,
    pub pages_dir: PathBuf,
}

impl Paths {
    pub fn new(base: &Path) -> Self {
        Self {
            data_dir: base.join("data"),
            files_dir: base.join("storage").join("files"),
            pages_dir: base.join("storage").join("pages"),
        }
    }

    pub fn releases_file(&self) -> PathBuf {
        self.data_dir.join(RELEASES_FILE)
    }

    pub fn counts_file(&self) -> PathBuf {
        self.data_dir.join(COUNTS_FILE)
    }
}
