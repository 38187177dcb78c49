use crate::filter::published_checksum;
use crate::provider::{ProviderAsset, ProviderError, ReleaseProvider};
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("download of {name} failed: {source}")]
    Download {
        name: String,
        source: ProviderError,
    },
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("checksum mismatch for {name} (published {expected}, computed {actual})")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
    pub size: u64,
    pub checksum: String,
    pub downloaded: bool,
}

/// Keeps release assets in the node's file storage, keyed by filename.
pub struct AssetFetcher {
    files_dir: PathBuf,
}

impl AssetFetcher {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
        }
    }

    pub fn cached_path(&self, filename: &str) -> PathBuf {
        self.files_dir.join(filename)
    }

    /// Makes sure `asset` is in the cache and returns its digest. An asset
    /// already present by name is never downloaded again.
    pub fn fetch<P: ReleaseProvider + ?Sized>(
        &self,
        provider: &P,
        tag: &str,
        asset: &ProviderAsset,
        notes: &str,
    ) -> Result<CachedAsset, AssetError> {
        let path = self.cached_path(&asset.name);
        let downloaded = if path.exists() {
            info!("Asset already exists: {}", asset.name);
            false
        } else {
            self.download(provider, tag, asset, &path)?;
            true
        };

        let checksum = file_checksum(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;

        if let Some(expected) = published_checksum(notes, &asset.name) {
            if expected != checksum {
                warn!("Removing {} after checksum mismatch", asset.name);
                let _ = fs::remove_file(&path);
                return Err(AssetError::ChecksumMismatch {
                    name: asset.name.clone(),
                    expected,
                    actual: checksum,
                });
            }
        }

        let size = fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|source| AssetError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(CachedAsset {
            size,
            checksum,
            downloaded,
        })
    }

    fn download<P: ReleaseProvider + ?Sized>(
        &self,
        provider: &P,
        tag: &str,
        asset: &ProviderAsset,
        dest: &Path,
    ) -> Result<(), AssetError> {
        fs::create_dir_all(&self.files_dir).map_err(|source| AssetError::Io {
            path: self.files_dir.clone(),
            source,
        })?;

        info!(
            "Downloading {} ({:.1} MB)",
            asset.name,
            asset.size as f64 / 1024.0 / 1024.0
        );
        let reader = provider
            .open_asset(tag, asset)
            .map_err(|source| AssetError::Download {
                name: asset.name.clone(),
                source,
            })?;

        // Partial downloads never carry the final name, so an interrupted run
        // is retried instead of being mistaken for a cached asset.
        let part = dest.with_file_name(format!("{}.part", asset.name));
        let result = write_stream(reader, &part, asset.size).and_then(|_| fs::rename(&part, dest));
        if let Err(source) = result {
            let _ = fs::remove_file(&part);
            return Err(AssetError::Io {
                path: dest.to_path_buf(),
                source,
            });
        }
        info!("Successfully downloaded {}", asset.name);
        Ok(())
    }
}

fn write_stream(reader: Box<dyn Read + Send>, path: &Path, expected: u64) -> io::Result<u64> {
    let pb = ProgressBar::new(expected);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{bar:40.cyan/blue} {bytes}/{total_bytes} {msg}")
    {
        pb.set_style(style);
    }
    let mut out = File::create(path)?;
    let mut reader = pb.wrap_read(reader);
    let written = io::copy(&mut reader, &mut out)?;
    out.flush()?;
    out.sync_all()?;
    pb.finish_and_clear();
    Ok(written)
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
