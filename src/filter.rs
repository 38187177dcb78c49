use crate::provider::ProviderAsset;
use glob::Pattern;
use regex::Regex;

const CHECKSUM_SUFFIXES: [&str; 5] = [".sha256sum", ".md5", ".sha256", ".sha512", ".md5sum"];

pub fn is_checksum_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    CHECKSUM_SUFFIXES.iter().any(|suf| lower.ends_with(suf))
}

/// First asset in listing order matching `pattern`. Checksum side-cars never
/// qualify.
pub fn select_asset<'a>(assets: &'a [ProviderAsset], pattern: &Pattern) -> Option<&'a ProviderAsset> {
    assets
        .iter()
        .find(|a| !is_checksum_file(&a.name) && pattern.matches(&a.name))
}

/// A SHA-256 published in the release notes on the same line as the asset's
/// full filename, e.g. `3f2a...  app-1.2.apk`. The filename must stand alone,
/// so `app-1.2-arm64.apk` or `app-1.2.apk.sig` never match `app-1.2.apk`.
pub fn published_checksum(body: &str, filename: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"(?im)\b([a-f0-9]{{64}})\b[^\n]*?[^\w.\-\n]{}(?:[^\w.\-]|$)",
        regex::escape(filename)
    ))
    .ok()?;
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(names: &[&str]) -> Vec<ProviderAsset> {
        names
            .iter()
            .map(|n| ProviderAsset {
                name: n.to_string(),
                size: 1,
                download_url: format!("https://example.invalid/{n}"),
            })
            .collect()
    }

    #[test]
    fn first_glob_match_wins() {
        let list = assets(&["app.apk", "app.apk.sha256", "readme.txt"]);
        let pattern = Pattern::new("*.apk").unwrap();
        assert_eq!(select_asset(&list, &pattern).unwrap().name, "app.apk");

        let list = assets(&["readme.txt", "b.apk", "a.apk"]);
        assert_eq!(select_asset(&list, &pattern).unwrap().name, "b.apk");
    }

    #[test]
    fn catch_all_skips_checksum_files() {
        let list = assets(&["app.apk.sha256", "SUMS.MD5", "app.apk"]);
        let pattern = Pattern::new("*").unwrap();
        assert_eq!(select_asset(&list, &pattern).unwrap().name, "app.apk");
    }

    #[test]
    fn no_match_yields_none() {
        let list = assets(&["readme.txt"]);
        assert!(select_asset(&list, &Pattern::new("*.apk").unwrap()).is_none());
        assert!(select_asset(&[], &Pattern::new("*").unwrap()).is_none());
    }

    #[test]
    fn finds_published_checksum_for_asset() {
        let digest = "a".repeat(64);
        let body = format!("Release notes\n\nSHA256:\n{digest}  sideband-1.2.apk\n");
        assert_eq!(
            published_checksum(&body, "sideband-1.2.apk").as_deref(),
            Some(digest.as_str())
        );
        assert!(published_checksum(&body, "other.apk").is_none());
        assert!(published_checksum("no hashes here", "sideband-1.2.apk").is_none());
    }

    #[test]
    fn sibling_asset_lines_are_skipped() {
        let arm = "1".repeat(64);
        let universal = "c".repeat(64);
        let body = format!(
            "{arm}  sideband-1.2-arm64.apk\n{universal}  sideband-1.2.apk\n{arm} *my-sideband-1.2.apk"
        );
        assert_eq!(
            published_checksum(&body, "sideband-1.2.apk").as_deref(),
            Some(universal.as_str())
        );
        assert_eq!(
            published_checksum(&body, "my-sideband-1.2.apk").as_deref(),
            Some(arm.as_str())
        );
        assert!(published_checksum(&format!("{arm}  app.apk.sig"), "app.apk").is_none());
    }

    #[test]
    fn checksum_must_share_the_line() {
        let digest = "b".repeat(64);
        let body = format!("{digest}\nsideband.apk");
        assert!(published_checksum(&body, "sideband.apk").is_none());
    }
}
