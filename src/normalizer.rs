use crate::filter::select_asset;
use crate::provider::{ProviderAsset, ProviderRelease};
use glob::Pattern;

const SUMMARY_MAX_CHARS: usize = 120;

/// A provider release reduced to what the document needs, with its selected
/// asset (if any) still attached for the fetch step.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRelease {
    pub tag: String,
    pub name: String,
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub is_prerelease: bool,
    pub body: String,
    pub body_summary: String,
    pub asset: Option<ProviderAsset>,
}

/// Newest first by publish time, capped at `max`. The provider's listing
/// order only breaks ties.
pub fn normalize(
    releases: &[ProviderRelease],
    pattern: &Pattern,
    max: usize,
) -> Vec<NormalizedRelease> {
    let mut out: Vec<NormalizedRelease> = releases
        .iter()
        .map(|r| NormalizedRelease {
            tag: r.tag.clone(),
            name: r.name.clone(),
            published_at: r.published_at,
            is_prerelease: r.is_prerelease,
            body: r.body.clone(),
            body_summary: summarize(&r.body),
            asset: select_asset(&r.assets, pattern).cloned(),
        })
        .collect();
    out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    out.truncate(max);
    out
}

/// First non-blank line of the notes without markdown heading or bullet
/// markers, cut at a character boundary.
pub fn summarize(body: &str) -> String {
    let Some(line) = body.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return String::new();
    };
    let line = line
        .trim_start_matches('#')
        .trim_start_matches(['-', '*', '+'])
        .trim();
    if line.chars().count() <= SUMMARY_MAX_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(SUMMARY_MAX_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(tag: &str, published: &str, prerelease: bool, assets: &[&str]) -> ProviderRelease {
        ProviderRelease {
            name: tag.to_string(),
            tag: tag.to_string(),
            published_at: published.parse().unwrap(),
            is_prerelease: prerelease,
            body: format!("## {tag}\nDetails"),
            assets: assets
                .iter()
                .map(|n| ProviderAsset {
                    name: n.to_string(),
                    size: 10,
                    download_url: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn resorts_by_publish_time_and_caps() {
        let input = vec![
            release("v1.0", "2024-01-01T00:00:00Z", false, &["a.apk"]),
            release("v3.0", "2024-09-01T00:00:00Z", false, &["c.apk"]),
            release("v2.0", "2024-06-01T00:00:00Z", true, &["b.apk"]),
        ];
        let out = normalize(&input, &Pattern::new("*.apk").unwrap(), 2);
        let tags: Vec<_> = out.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, ["v3.0", "v2.0"]);
        assert!(out[1].is_prerelease);
    }

    #[test]
    fn keeps_releases_without_matching_asset() {
        let input = vec![release("v1.0", "2024-01-01T00:00:00Z", false, &["notes.txt"])];
        let out = normalize(&input, &Pattern::new("*.apk").unwrap(), 10);
        assert_eq!(out.len(), 1);
        assert!(out[0].asset.is_none());
    }

    #[test]
    fn prerelease_flag_is_not_guessed_from_tag() {
        let input = vec![release("v2.1-beta", "2024-07-01T00:00:00Z", false, &[])];
        let out = normalize(&input, &Pattern::new("*").unwrap(), 10);
        assert!(!out[0].is_prerelease);
    }

    #[test]
    fn summary_uses_first_content_line() {
        assert_eq!(summarize("\n\n## What's new\n- fixes"), "What's new");
        assert_eq!(summarize("- Faster sync\nmore"), "Faster sync");
        assert_eq!(summarize(""), "");
        assert_eq!(summarize("   \n  "), "");
    }

    #[test]
    fn summary_truncates_long_lines() {
        let long = "é".repeat(300);
        let summary = summarize(&long);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS);
    }

    #[test]
    fn body_is_kept_verbatim() {
        let mut input = release("v1.0", "2024-01-01T00:00:00Z", false, &[]);
        input.body = "line one\n\n  line two  \n".to_string();
        let out = normalize(&[input.clone()], &Pattern::new("*").unwrap(), 10);
        assert_eq!(out[0].body, input.body);
    }
}
