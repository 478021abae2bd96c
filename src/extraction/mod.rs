//! Archive extraction with password support
//!
//! Handles ZIP, 7z and RAR archives behind the [`ArchiveCodec`] trait.
//! The [`NativeCodec`] default implementation dispatches on the file
//! extension and runs the blocking decode off the async runtime. On top of
//! the raw codec, [`run_extraction`] builds the full pipeline result:
//! password handling, per-category statistics and a stable file listing.

mod rar;
mod sevenz;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use rar::RarExtractor;
pub use sevenz::SevenZipExtractor;
pub use zip::ZipExtractor;

use crate::error::{Error, ExtractError, InputError, Result};
use crate::types::{classify_file, ExtractionResult, ExtractionStats};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Supported archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// ZIP (including ZipCrypto and AES entries)
    Zip,
    /// 7-Zip
    SevenZ,
    /// RAR (single or first part of a split set)
    Rar,
}

/// Detect the archive type from the file extension
#[must_use]
pub fn detect_archive_type(path: &Path) -> Option<ArchiveType> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)?;

    match ext.as_str() {
        "zip" => Some(ArchiveType::Zip),
        "7z" => Some(ArchiveType::SevenZ),
        "rar" | "r00" => Some(ArchiveType::Rar),
        _ => None,
    }
}

/// Whether the path looks like an archive this module can open
#[must_use]
pub fn is_archive(path: &Path) -> bool {
    detect_archive_type(path).is_some()
}

/// Decode seam for archive containers.
///
/// Implementations must distinguish the password signal
/// ([`ExtractError::WrongPassword`]) from corruption so callers can
/// re-prompt instead of giving up.
#[async_trait]
pub trait ArchiveCodec: Send + Sync {
    /// Whether the archive demands a password before its content is readable
    async fn probe_encrypted(&self, archive: &Path) -> Result<bool>;

    /// Extract the archive into `dest`, returning the extracted file paths
    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
    ) -> Result<Vec<PathBuf>>;
}

/// Codec backed by the in-process zip / sevenz / unrar decoders
pub struct NativeCodec;

#[async_trait]
impl ArchiveCodec for NativeCodec {
    async fn probe_encrypted(&self, archive: &Path) -> Result<bool> {
        let archive_type = require_archive_type(archive)?;
        let archive = archive.to_path_buf();

        spawn_decode(move || match archive_type {
            ArchiveType::Zip => ZipExtractor::probe_encrypted(&archive),
            ArchiveType::SevenZ => SevenZipExtractor::probe_encrypted(&archive),
            ArchiveType::Rar => RarExtractor::probe_encrypted(&archive),
        })
        .await
    }

    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        let archive_type = require_archive_type(archive)?;
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        let password = password.map(str::to_string);

        debug!(?archive, ?dest, has_password = password.is_some(), "starting archive decode");

        spawn_decode(move || {
            let password = password.as_deref().unwrap_or_default();
            match archive_type {
                ArchiveType::Zip => ZipExtractor::try_extract(&archive, password, &dest),
                ArchiveType::SevenZ => SevenZipExtractor::try_extract(&archive, password, &dest),
                ArchiveType::Rar => RarExtractor::try_extract(&archive, password, &dest),
            }
        })
        .await
    }
}

fn require_archive_type(path: &Path) -> Result<ArchiveType> {
    detect_archive_type(path).ok_or_else(|| {
        Error::Input(InputError::UnsupportedArchive {
            path: path.to_path_buf(),
        })
    })
}

/// Run a blocking decode closure off the async runtime
async fn spawn_decode<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Other(format!("archive decode task panicked: {}", e)))?
}

/// Full extraction pipeline: password handling, stats, stable listing.
///
/// An encrypted archive without a supplied password fails with
/// [`ExtractError::PasswordRequired`] before any entry content lands in
/// `dest`; callers wanting to fail before `dest` even exists probe with
/// [`ArchiveCodec::probe_encrypted`] first. A wrong supplied password fails
/// with [`ExtractError::WrongPassword`]. On success the extracted tree is
/// walked to build per-category statistics and a case-insensitively sorted
/// listing of paths relative to `dest`.
pub async fn run_extraction(
    codec: &dyn ArchiveCodec,
    archive: &Path,
    dest: &Path,
    password: Option<&str>,
) -> Result<ExtractionResult> {
    let extracted = match codec.extract(archive, dest, password).await {
        Ok(files) => files,
        // A password failure without a supplied password is the
        // missing-password signal, not the wrong-password one
        Err(Error::Extract(ExtractError::WrongPassword { archive })) if password.is_none() => {
            return Err(Error::Extract(ExtractError::PasswordRequired { archive }));
        }
        Err(e) => return Err(e),
    };

    let result = summarize_tree(dest)?;

    info!(
        ?archive,
        files = result.stats.total_files,
        folders = result.stats.folders,
        videos = result.stats.videos,
        "extraction pipeline complete"
    );
    debug!(extracted_count = extracted.len(), "codec reported extracted files");

    Ok(result)
}

/// Walk `dest` and build stats plus the sorted relative listing
fn summarize_tree(dest: &Path) -> Result<ExtractionResult> {
    let mut stats = ExtractionStats::default();
    let mut files = Vec::new();

    for entry in WalkDir::new(dest) {
        let entry = entry
            .map_err(|e| Error::Other(format!("failed to walk extracted tree: {}", e)))?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            if path != dest {
                stats.folders += 1;
            }
            continue;
        }

        stats.record(classify_file(path));

        let relative = path
            .strip_prefix(dest)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        files.push(relative);
    }

    files.sort_by_key(|f| f.to_lowercase());

    Ok(ExtractionResult {
        stats,
        files,
        base_dir: dest.to_path_buf(),
    })
}
