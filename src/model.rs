use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One mirrored release as stored in `releases.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReleaseRecord {
    pub tag: String,
    pub name: String,
    pub published_at: DateTime<Utc>,
    pub is_prerelease: bool,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_summary: String,
    #[serde(default)]
    pub asset_filename: Option<String>,
    #[serde(default)]
    pub asset_size: Option<u64>,
    #[serde(default)]
    pub checksum: Option<String>,
}

/// Display configuration captured at sync time. Pages read their settings
/// from here, never from the live config file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_description: String,
    #[serde(default)]
    pub page_title: String,
    #[serde(default)]
    pub asset_pattern: String,
    #[serde(default)]
    pub max_releases: usize,
    #[serde(default)]
    pub ascii_art_file: Option<String>,
    #[serde(default)]
    pub ascii_bg_color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReleaseDocument {
    pub config: ConfigSnapshot,
    pub last_sync: DateTime<Utc>,
    #[serde(default)]
    pub latest_stable: Option<ReleaseRecord>,
    #[serde(default)]
    pub latest_prerelease: Option<ReleaseRecord>,
    #[serde(default)]
    pub all_releases: Vec<ReleaseRecord>,
}

impl ReleaseDocument {
    /// Builds a document from a fresh set of records. The latest pointers are
    /// always derived from the sorted list.
    pub fn assemble(
        config: ConfigSnapshot,
        mut releases: Vec<ReleaseRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Self {
            config,
            last_sync: now,
            latest_stable: latest_stable(&releases).cloned(),
            latest_prerelease: latest_prerelease(&releases).cloned(),
            all_releases: releases,
        }
    }

    pub fn find_asset(&self, filename: &str) -> Option<&ReleaseRecord> {
        self.all_releases
            .iter()
            .find(|r| r.asset_filename.as_deref() == Some(filename))
    }
}

pub fn latest_stable(releases: &[ReleaseRecord]) -> Option<&ReleaseRecord> {
    releases.iter().find(|r| !r.is_prerelease)
}

pub fn latest_prerelease(releases: &[ReleaseRecord]) -> Option<&ReleaseRecord> {
    releases.iter().find(|r| r.is_prerelease)
}

/// Contents of `download_counts.json`. Keys are never removed.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CounterDocument {
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CounterDocument {
    pub fn get(&self, filename: &str) -> u64 {
        self.counts.get(filename).copied().unwrap_or(0)
    }

    pub fn bump(&mut self, filename: &str, now: DateTime<Utc>) -> u64 {
        let count = self.counts.entry(filename.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        self.last_updated = Some(now);
        *count
    }
}

#[cfg(test)]
pub(crate) fn record(tag: &str, published: &str, prerelease: bool) -> ReleaseRecord {
    ReleaseRecord {
        tag: tag.to_string(),
        name: tag.to_string(),
        published_at: published.parse().unwrap(),
        is_prerelease: prerelease,
        body: String::new(),
        body_summary: String::new(),
        asset_filename: Some(format!("{tag}.apk")),
        asset_size: Some(1024),
        checksum: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            app_name: "App".to_string(),
            app_description: String::new(),
            page_title: "App Downloads".to_string(),
            asset_pattern: "*.apk".to_string(),
            max_releases: 10,
            ascii_art_file: None,
            ascii_bg_color: None,
        }
    }

    #[test]
    fn assemble_sorts_and_derives_latest() {
        let releases = vec![
            record("v1.0", "2024-01-01T00:00:00Z", false),
            record("v2.1-beta", "2024-07-01T00:00:00Z", true),
            record("v2.0", "2024-06-01T00:00:00Z", false),
        ];
        let doc = ReleaseDocument::assemble(snapshot(), releases, Utc::now());

        let tags: Vec<_> = doc.all_releases.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, ["v2.1-beta", "v2.0", "v1.0"]);
        assert_eq!(doc.latest_stable.unwrap().tag, "v2.0");
        assert_eq!(doc.latest_prerelease.unwrap().tag, "v2.1-beta");
    }

    #[test]
    fn latest_is_absent_without_matching_kind() {
        let only_stable = vec![record("v1.0", "2024-01-01T00:00:00Z", false)];
        assert!(latest_prerelease(&only_stable).is_none());
        assert_eq!(latest_stable(&only_stable).unwrap().tag, "v1.0");
        assert!(latest_stable(&[]).is_none());
    }

    #[test]
    fn counter_document_serializes_null_timestamp() {
        let doc = CounterDocument::default();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({"counts": {}, "last_updated": null}));
    }

    #[test]
    fn release_document_ignores_unknown_keys() {
        let json = r#"{
            "config": {"app_name": "App", "page_title": "App Downloads", "theme": "dark"},
            "last_sync": "2024-07-02T00:00:00Z",
            "all_releases": [],
            "extra": 1
        }"#;
        let doc: ReleaseDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.config.app_name, "App");
        assert!(doc.latest_stable.is_none());
    }

    #[test]
    fn release_document_tolerates_missing_display_names() {
        let json = r#"{
            "config": {"asset_pattern": "*.apk"},
            "last_sync": "2024-07-02T00:00:00Z",
            "all_releases": []
        }"#;
        let doc: ReleaseDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.config.app_name, "");
        assert_eq!(doc.config.page_title, "");
        assert_eq!(doc.config.asset_pattern, "*.apk");
    }
}
