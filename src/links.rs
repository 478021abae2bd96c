//! URL extraction and classification.
//!
//! Scans free text for `http(s)` URLs, trims trailing punctuation that chat
//! clients glue onto links, and sorts each URL into a [`LinkCategory`] by a
//! fixed precedence: cloud drive, platform-internal, streaming manifest,
//! known direct extension, unknown. Unknown is fail-open: unrecognized links
//! are still treated as direct-download candidates downstream.

use crate::types::{LinkCategory, LinkMap};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Extensions treated as a direct-download target when a URL path ends in one
const DIRECT_EXTENSIONS: &[&str] = &[
    // video
    "mp4", "mkv", "mov", "avi", "webm", "ts",
    // audio
    "mp3", "m4a", "aac", "ogg", "opus", "flac", "wav",
    // archives
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "tbz2", "xz",
    // packages
    "apk", "xapk", "apks",
];

/// Text file extensions scanned for links inside an extracted tree
const SCANNABLE_EXTENSIONS: &[&str] = &["txt", "m3u", "m3u8"];

fn url_regex() -> &'static Regex {
    static URL_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    // The pattern is a constant literal; it cannot fail to compile
    #[allow(clippy::unwrap_used)]
    URL_RE.get_or_init(|| Regex::new(r"(?i)https?://[^\s]+").unwrap())
}

/// Extract every URL from free text, in order of appearance.
///
/// Trailing `.`, `,`, `)` and `"` are stripped from each match. Duplicates are
/// NOT removed here; callers that want uniqueness dedup themselves.
#[must_use]
pub fn find_links(text: &str) -> Vec<String> {
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')', '"']).to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Classify one URL into its [`LinkCategory`]
#[must_use]
pub fn classify(url: &str) -> LinkCategory {
    let lower = url.to_lowercase();

    let host = url::Url::parse(&lower)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    if host.contains("drive.google.com") {
        return LinkCategory::CloudDrive;
    }
    if host == "t.me" || host.ends_with(".t.me") || host.contains("telegram.me") {
        return LinkCategory::PlatformInternal;
    }

    // Strip query/fragment before the extension checks
    let path = lower
        .split(['?', '#'])
        .next()
        .unwrap_or(&lower)
        .to_string();

    if path.ends_with(".m3u8") {
        return LinkCategory::StreamingManifest;
    }
    if DIRECT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
    {
        return LinkCategory::Direct;
    }

    LinkCategory::Unknown
}

/// Extract and classify every URL in `text`.
///
/// Order of appearance is preserved within each category; duplicates are
/// kept (raw chat text is classified as-is).
#[must_use]
pub fn classify_links(text: &str) -> LinkMap {
    let mut map = LinkMap::new();
    for url in find_links(text) {
        let category = classify(&url);
        map.entry(category).or_default().push(url);
    }
    map
}

/// Walk an extracted tree and collect links from text-like files.
///
/// Only `.txt`, `.m3u` and `.m3u8` files are read. Content is decoded
/// lossily; unreadable files are skipped with a debug log. Unlike
/// [`classify_links`], results are deduplicated per category in first-seen
/// order, since extracted trees routinely repeat the same link across files.
#[must_use]
pub fn scan_links_in_tree(root: &Path) -> LinkMap {
    let mut map = LinkMap::new();
    let mut seen: HashSet<String> = HashSet::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || !is_scannable(entry.path()) {
            continue;
        }

        let content = match std::fs::read(entry.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(path = ?entry.path(), error = %e, "skipping unreadable file in link scan");
                continue;
            }
        };

        for url in find_links(&content) {
            if seen.insert(url.clone()) {
                map.entry(classify(&url)).or_default().push(url);
            }
        }
    }

    map
}

fn is_scannable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|ext| SCANNABLE_EXTENSIONS.contains(&ext.as_str()))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_links_trims_trailing_punctuation() {
        let text = "see https://example.com/a.mp4. and (https://example.com/b.zip), ok";
        let links = find_links(text);
        assert_eq!(
            links,
            vec!["https://example.com/a.mp4", "https://example.com/b.zip"]
        );
    }

    #[test]
    fn find_links_keeps_duplicates_and_order() {
        let text = "https://a.com/x https://b.com/y https://a.com/x";
        let links = find_links(text);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0], links[2]);
    }

    #[test]
    fn classification_precedence() {
        assert_eq!(
            classify("https://drive.google.com/file/d/abc123/view"),
            LinkCategory::CloudDrive
        );
        assert_eq!(
            classify("https://t.me/somechannel/42"),
            LinkCategory::PlatformInternal
        );
        assert_eq!(
            classify("https://cdn.example.com/live/master.m3u8"),
            LinkCategory::StreamingManifest
        );
        assert_eq!(
            classify("https://example.com/movie.MKV"),
            LinkCategory::Direct
        );
        assert_eq!(
            classify("https://example.com/data.tar.gz"),
            LinkCategory::Direct
        );
        assert_eq!(
            classify("https://example.com/watch?v=123"),
            LinkCategory::Unknown
        );
    }

    #[test]
    fn documents_are_not_direct_candidates() {
        // Only video/audio/archive/package extensions are direct; everything
        // else goes through the unknown fail-open path
        assert_eq!(classify("https://example.com/doc.pdf"), LinkCategory::Unknown);
        assert_eq!(
            classify("https://example.com/notes.txt"),
            LinkCategory::Unknown
        );
    }

    #[test]
    fn manifest_detected_despite_query_string() {
        assert_eq!(
            classify("https://cdn.example.com/index.m3u8?token=abc"),
            LinkCategory::StreamingManifest
        );
    }

    #[test]
    fn tree_scan_dedups_but_raw_text_does_not() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("one.txt"),
            "https://example.com/a.mp4\nhttps://example.com/a.mp4",
        )
        .unwrap();
        std::fs::write(dir.path().join("two.txt"), "https://example.com/a.mp4").unwrap();
        // Non-scannable files are ignored entirely
        std::fs::write(dir.path().join("skip.bin"), "https://example.com/z.mp4").unwrap();

        let map = scan_links_in_tree(dir.path());
        assert_eq!(map[&LinkCategory::Direct], vec!["https://example.com/a.mp4"]);

        let raw = find_links("https://example.com/a.mp4 https://example.com/a.mp4");
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn tree_scan_reads_playlists() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("list.m3u8"),
            "#EXTM3U\nhttps://cdn.example.com/v/index.m3u8\n",
        )
        .unwrap();

        let map = scan_links_in_tree(dir.path());
        assert_eq!(
            map[&LinkCategory::StreamingManifest],
            vec!["https://cdn.example.com/v/index.m3u8"]
        );
    }
}
