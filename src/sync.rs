use crate::config::{ASCII_ART_TARGET, Config, Paths};
use crate::downloader::AssetFetcher;
use crate::model::{ReleaseDocument, ReleaseRecord};
use crate::normalizer::{NormalizedRelease, normalize};
use crate::provider::{ProviderError, ReleaseProvider};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The provider could not be reached; the previous document stays in place.
    #[error("failed to fetch releases: {0}")]
    Provider(#[from] ProviderError),
    #[error("failed to persist release document: {0:#}")]
    Store(anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub releases: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub without_asset: usize,
    pub asset_failures: usize,
    pub new_tags: Vec<String>,
}

/// Runs one fetch → normalize → fetch assets → write cycle.
pub struct Syncer<'a, P: ReleaseProvider + ?Sized> {
    config: &'a Config,
    paths: &'a Paths,
    provider: &'a P,
}

impl<'a, P: ReleaseProvider + ?Sized> Syncer<'a, P> {
    pub fn new(config: &'a Config, paths: &'a Paths, provider: &'a P) -> Self {
        Self {
            config,
            paths,
            provider,
        }
    }

    pub fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        self.run_cycle_at(Utc::now())
    }

    pub fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        info!("Starting {} release sync", self.config.app_name);
        for dir in [&self.paths.data_dir, &self.paths.files_dir, &self.paths.pages_dir] {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("could not create {}: {e}", dir.display());
            }
        }
        self.install_ascii_art();

        let listed = self.provider.list_releases(self.config.max_releases)?;
        let normalized = normalize(
            &listed,
            &self.config.asset_pattern,
            self.config.max_releases,
        );

        let mut report = SyncReport::default();
        let fetcher = AssetFetcher::new(&self.paths.files_dir);
        let records: Vec<ReleaseRecord> = normalized
            .into_iter()
            .map(|release| self.resolve(&fetcher, release, &mut report))
            .collect();

        let store = DocumentStore::new(self.paths.releases_file());
        let previous = store.load();
        let doc = ReleaseDocument::assemble(self.config.snapshot(), records, now);
        report.releases = doc.all_releases.len();
        report.new_tags = new_tags(previous.as_ref(), &doc);

        info!(
            "Latest stable: {}",
            doc.latest_stable.as_ref().map_or("none", |r| r.tag.as_str())
        );
        info!(
            "Latest prerelease: {}",
            doc.latest_prerelease
                .as_ref()
                .map_or("none", |r| r.tag.as_str())
        );

        store.save(&doc).map_err(SyncError::Store)?;
        info!("Wrote release data to {}", store.path().display());

        self.update_latest_symlink(&doc);
        if !report.new_tags.is_empty() {
            info!("New releases: {}", report.new_tags.join(", "));
        }
        info!(
            "Sync complete: {} releases, {} downloaded, {} cached, {} failed",
            report.releases, report.downloaded, report.cached, report.asset_failures
        );
        Ok(report)
    }

    fn resolve(
        &self,
        fetcher: &AssetFetcher,
        release: NormalizedRelease,
        report: &mut SyncReport,
    ) -> ReleaseRecord {
        let mut record = ReleaseRecord {
            tag: release.tag,
            name: release.name,
            published_at: release.published_at,
            is_prerelease: release.is_prerelease,
            body: release.body,
            body_summary: release.body_summary,
            asset_filename: None,
            asset_size: None,
            checksum: None,
        };
        let Some(asset) = release.asset else {
            report.without_asset += 1;
            return record;
        };

        match fetcher.fetch(self.provider, &record.tag, &asset, &record.body) {
            Ok(cached) => {
                if cached.downloaded {
                    report.downloaded += 1;
                } else {
                    report.cached += 1;
                }
                record.asset_filename = Some(asset.name);
                record.asset_size = Some(cached.size);
                record.checksum = Some(cached.checksum);
            }
            Err(e) => {
                error!("{}: {e}", record.tag);
                report.asset_failures += 1;
            }
        }
        record
    }

    fn install_ascii_art(&self) {
        let Some(src) = &self.config.ascii_art_file else {
            return;
        };
        let dst = self.paths.pages_dir.join(ASCII_ART_TARGET);
        match fs::copy(src, &dst) {
            Ok(_) => info!("Installed ASCII art to {}", dst.display()),
            Err(e) => warn!("could not install ASCII art {}: {e}", src.display()),
        }
    }

    /// `<app>-latest<ext>` in the files directory always points at the newest
    /// stable asset.
    fn update_latest_symlink(&self, doc: &ReleaseDocument) {
        let Some(filename) = doc
            .latest_stable
            .as_ref()
            .and_then(|r| r.asset_filename.as_deref())
        else {
            return;
        };
        let link = self
            .paths
            .files_dir
            .join(latest_link_name(&self.config.app_name, filename));
        if let Err(e) = replace_symlink(filename, &link) {
            warn!("could not update {}: {e}", link.display());
        } else {
            info!("Updated symlink: {} -> {filename}", link.display());
        }
    }
}

/// One scheduled sync as the binary runs it. An unreachable provider keeps
/// the previous document and counts as success; the next scheduled run
/// retries. Failing to write the document is an error.
pub fn run<P: ReleaseProvider + ?Sized>(
    config: &Config,
    paths: &Paths,
    provider: &P,
) -> anyhow::Result<()> {
    match Syncer::new(config, paths, provider).run_cycle() {
        Ok(_) => Ok(()),
        Err(SyncError::Provider(e)) => {
            error!("Failed to fetch releases, keeping previous data: {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn latest_link_name(app_name: &str, filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}-latest{ext}", app_name.to_lowercase().replace(' ', "-"))
}

#[cfg(unix)]
fn replace_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link)?;
    }
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn replace_symlink(_target: &str, _link: &Path) -> std::io::Result<()> {
    Ok(())
}

fn new_tags(previous: Option<&ReleaseDocument>, current: &ReleaseDocument) -> Vec<String> {
    let known: HashSet<&str> = previous
        .map(|d| d.all_releases.iter().map(|r| r.tag.as_str()).collect())
        .unwrap_or_default();
    current
        .all_releases
        .iter()
        .filter(|r| !known.contains(r.tag.as_str()))
        .map(|r| r.tag.clone())
        .collect()
}
