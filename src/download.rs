use crate::counter::{CounterLock, CounterStore};
use crate::model::ReleaseDocument;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("release data not available")]
    NotAvailable,
    #[error("{0} is not a mirrored asset")]
    UnknownAsset(String),
    #[error("{0} is not present in file storage")]
    Missing(String),
}

/// What a download page needs: the file to hand out and its view count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub path: PathBuf,
    pub count: u64,
}

/// Resolves a download request and records the view. Counting is a side
/// channel: its outcome never changes whether the file is served.
pub fn serve_download<L: CounterLock>(
    doc: Option<&ReleaseDocument>,
    counter: &CounterStore<L>,
    files_dir: &Path,
    filename: &str,
) -> Result<Download, DownloadError> {
    let doc = doc.ok_or(DownloadError::NotAvailable)?;
    // Only names taken from the document are served, which also keeps
    // requests from escaping the files directory.
    let record = doc
        .find_asset(filename)
        .ok_or_else(|| DownloadError::UnknownAsset(filename.to_string()))?;
    let filename = record.asset_filename.clone().unwrap_or_default();

    let path = files_dir.join(&filename);
    if !path.is_file() {
        return Err(DownloadError::Missing(filename));
    }

    let count = counter.increment(&filename);
    Ok(Download {
        filename,
        path,
        count,
    })
}

/// The line a download page prints: `<path>\t<count>`, or a notice while
/// no sync has completed yet. Unknown or missing assets stay errors.
pub fn page_output<L: CounterLock>(
    doc: Option<&ReleaseDocument>,
    counter: &CounterStore<L>,
    files_dir: &Path,
    filename: &str,
) -> Result<String, DownloadError> {
    match serve_download(doc, counter, files_dir, filename) {
        Ok(download) => Ok(format!("{}\t{}", download.path.display(), download.count)),
        Err(DownloadError::NotAvailable) => Ok("Release data not available yet".to_string()),
        Err(e) => Err(e),
    }
}
