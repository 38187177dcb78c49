use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info};

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("nomadnet-releases/", env!("CARGO_PKG_VERSION"));
const LIST_TIMEOUT: Duration = Duration::from_secs(60);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("authentication rejected ({0})")]
    Auth(StatusCode),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed provider response: {0}")]
    Decode(String),
    #[error("provider returned no releases")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAsset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRelease {
    pub name: String,
    pub tag: String,
    pub published_at: DateTime<Utc>,
    pub is_prerelease: bool,
    pub body: String,
    pub assets: Vec<ProviderAsset>,
}

/// Upstream source of release metadata and asset bytes.
pub trait ReleaseProvider {
    fn list_releases(&self, limit: usize) -> Result<Vec<ProviderRelease>, ProviderError>;

    fn open_asset(
        &self,
        tag: &str,
        asset: &ProviderAsset,
    ) -> Result<Box<dyn Read + Send>, ProviderError>;
}

#[derive(Deserialize, Debug)]
struct GithubRelease {
    tag_name: String,
    name: Option<String>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    published_at: Option<DateTime<Utc>>,
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Deserialize, Debug)]
struct GithubAsset {
    name: String,
    size: u64,
    browser_download_url: String,
}

impl GithubRelease {
    fn into_release(self) -> Option<ProviderRelease> {
        if self.draft {
            return None;
        }
        let published_at = self.published_at?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.tag_name.clone());
        Some(ProviderRelease {
            name,
            tag: self.tag_name,
            published_at,
            is_prerelease: self.prerelease,
            body: self.body.unwrap_or_default(),
            assets: self
                .assets
                .into_iter()
                .map(|a| ProviderAsset {
                    name: a.name,
                    size: a.size,
                    download_url: a.browser_download_url,
                })
                .collect(),
        })
    }
}

pub struct GithubProvider {
    client: Client,
    repo: String,
    token: Option<String>,
}

impl GithubProvider {
    pub fn new(repo: &str) -> Result<Self, ProviderError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(Self {
            client,
            repo: repo.to_string(),
            token,
        })
    }

    fn get(&self, url: &str, timeout: Duration) -> reqwest::blocking::RequestBuilder {
        let req = self.client.get(url).timeout(timeout);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

fn check_status(resp: Response) -> Result<Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let exhausted = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
        StatusCode::FORBIDDEN if exhausted => Err(ProviderError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::Auth(status)),
        _ => Err(ProviderError::Status {
            status,
            url: resp.url().to_string(),
        }),
    }
}

/// Drafts and unpublished entries are dropped after listing, so ask for
/// twice the cap.
fn page_size(limit: usize) -> usize {
    limit.saturating_mul(2).clamp(1, MAX_PER_PAGE)
}

impl ReleaseProvider for GithubProvider {
    fn list_releases(&self, limit: usize) -> Result<Vec<ProviderRelease>, ProviderError> {
        let per_page = page_size(limit);
        let url = format!(
            "{API_BASE}/repos/{}/releases?per_page={per_page}",
            self.repo
        );
        info!("Fetching releases from {}", self.repo);
        let resp = check_status(
            self.get(&url, LIST_TIMEOUT)
                .header("Accept", "application/vnd.github+json")
                .send()?,
        )?;
        let raw: Vec<GithubRelease> = resp
            .json()
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let releases: Vec<_> = raw
            .into_iter()
            .filter_map(GithubRelease::into_release)
            .collect();
        debug!("provider listed {} published releases", releases.len());
        if releases.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(releases)
    }

    fn open_asset(
        &self,
        tag: &str,
        asset: &ProviderAsset,
    ) -> Result<Box<dyn Read + Send>, ProviderError> {
        debug!("opening asset {} of {}", asset.name, tag);
        let resp = check_status(
            self.get(&asset.download_url, DOWNLOAD_TIMEOUT)
                .header("Accept", "application/octet-stream")
                .send()?,
        )?;
        Ok(Box::new(resp))
    }
}
