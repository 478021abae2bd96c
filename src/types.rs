//! Core types shared across the engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier for an end user of the embedding bot.
///
/// Matches the numeric user ids handed out by messaging platforms.
pub type UserId = i64;

/// Opaque id for a short-lived session task (delivery or stream selection)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh random hex id
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category assigned to a URL by the link classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCategory {
    /// Hosted on the supported cloud-drive service; needs a link rewrite first
    CloudDrive,
    /// Points back into the messaging platform itself; never auto-downloaded
    PlatformInternal,
    /// An HLS manifest (`.m3u8` path)
    StreamingManifest,
    /// Path ends in a known media/archive/package extension
    Direct,
    /// Anything else; treated as a direct-download candidate (fail-open)
    Unknown,
}

impl LinkCategory {
    /// Stable lowercase name, used in logs and reports
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkCategory::CloudDrive => "cloud_drive",
            LinkCategory::PlatformInternal => "platform_internal",
            LinkCategory::StreamingManifest => "streaming_manifest",
            LinkCategory::Direct => "direct",
            LinkCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Links grouped by category, insertion order preserved within a category
pub type LinkMap = BTreeMap<LinkCategory, Vec<String>>;

/// File category used for extraction statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    /// Playable video container
    Video,
    /// PDF document
    Pdf,
    /// Android package
    Apk,
    /// Plain text
    Txt,
    /// M3U / M3U8 playlist
    Playlist,
    /// Everything else
    Other,
}

/// Video container extensions recognized for playable-media delivery
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "ts"];

/// Classify a file path by extension for extraction statistics
#[must_use]
pub fn classify_file(path: &Path) -> FileCategory {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        e if VIDEO_EXTENSIONS.contains(&e) => FileCategory::Video,
        "pdf" => FileCategory::Pdf,
        "apk" | "xapk" | "apks" => FileCategory::Apk,
        "txt" => FileCategory::Txt,
        "m3u" | "m3u8" => FileCategory::Playlist,
        _ => FileCategory::Other,
    }
}

/// Whether a path has a recognized video extension
#[must_use]
pub fn is_video_path(path: &Path) -> bool {
    classify_file(path) == FileCategory::Video
}

/// Aggregate statistics for one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Total extracted files (all categories)
    pub total_files: u64,
    /// Directories created under the output tree
    pub folders: u64,
    /// Video files
    pub videos: u64,
    /// PDF documents
    pub pdf: u64,
    /// Android packages
    pub apk: u64,
    /// Plain-text files
    pub txt: u64,
    /// M3U / M3U8 playlists
    pub m3u: u64,
    /// Files not matching any category above
    pub others: u64,
}

impl ExtractionStats {
    /// Record one file in its category and the running total
    pub fn record(&mut self, category: FileCategory) {
        self.total_files += 1;
        match category {
            FileCategory::Video => self.videos += 1,
            FileCategory::Pdf => self.pdf += 1,
            FileCategory::Apk => self.apk += 1,
            FileCategory::Txt => self.txt += 1,
            FileCategory::Playlist => self.m3u += 1,
            FileCategory::Other => self.others += 1,
        }
    }

    /// Sum of the per-category counters; always equals `total_files`
    #[must_use]
    pub fn category_sum(&self) -> u64 {
        self.videos + self.pdf + self.apk + self.txt + self.m3u + self.others
    }
}

/// Result of one archive extraction: stats plus the sorted relative file list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Aggregate per-category counts
    pub stats: ExtractionStats,
    /// Relative paths under `base_dir`, case-insensitive lexicographic order
    pub files: Vec<String>,
    /// Root of the extracted tree
    pub base_dir: PathBuf,
}

/// One selectable quality rendition of a streaming manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Display label: `"720p"`, `"800kbps"`, or `"Auto"`
    pub label: String,
    /// Absolute URL of the variant playlist
    pub url: String,
}

/// Outcome counters for one batch-download invocation
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Items fetched to disk successfully
    pub ok: u64,
    /// Items that failed (including unrewritable cloud-drive links)
    pub fail: u64,
    /// Paths of the successfully downloaded files, in processing order
    pub files: Vec<PathBuf>,
    /// Streaming-manifest URLs deferred to variant selection
    pub manifests: Vec<String>,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_file_covers_all_stat_categories() {
        assert_eq!(classify_file(Path::new("a/b.MP4")), FileCategory::Video);
        assert_eq!(classify_file(Path::new("doc.pdf")), FileCategory::Pdf);
        assert_eq!(classify_file(Path::new("app.xapk")), FileCategory::Apk);
        assert_eq!(classify_file(Path::new("notes.txt")), FileCategory::Txt);
        assert_eq!(classify_file(Path::new("list.m3u8")), FileCategory::Playlist);
        assert_eq!(classify_file(Path::new("data.bin")), FileCategory::Other);
        assert_eq!(classify_file(Path::new("noext")), FileCategory::Other);
    }

    #[test]
    fn stats_record_keeps_total_consistent() {
        let mut stats = ExtractionStats::default();
        stats.record(FileCategory::Video);
        stats.record(FileCategory::Txt);
        stats.record(FileCategory::Other);
        stats.record(FileCategory::Other);
        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.category_sum(), stats.total_files);
        assert_eq!(stats.videos, 1);
        assert_eq!(stats.others, 2);
    }

    #[test]
    fn task_ids_are_unique_hex() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert_eq!(a.0.len(), 32);
        assert!(a.0.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
