use crate::error::{Error, ExtractError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Archive extractor for 7z files
pub struct SevenZipExtractor;

impl SevenZipExtractor {
    /// Whether the archive demands a password to open.
    ///
    /// Detects header encryption; content-only encryption surfaces as a
    /// password error during extraction instead.
    pub fn probe_encrypted(archive_path: &Path) -> Result<bool> {
        use sevenz_rust::Password;

        match sevenz_rust::SevenZReader::open(archive_path, Password::empty()) {
            Ok(_) => Ok(false),
            Err(e) => {
                let err_str = e.to_string().to_lowercase();
                Ok(err_str.contains("password"))
            }
        }
    }

    /// Try to extract a 7z archive with a single password
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting 7z extraction"
        );

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        use sevenz_rust::Password;
        let result = if password.is_empty() {
            sevenz_rust::decompress_file(archive_path, dest_path)
        } else {
            let pw = Password::from(password);
            sevenz_rust::decompress_file_with_password(archive_path, dest_path, pw)
        };

        match result {
            Ok(()) => {
                // Path traversal protection: every extracted file must
                // resolve inside dest_path
                Self::validate_extracted_paths(dest_path)?;

                let extracted_files = Self::collect_extracted_files(dest_path)?;

                info!(
                    ?archive_path,
                    extracted_count = extracted_files.len(),
                    "7z extraction successful"
                );
                Ok(extracted_files)
            }
            Err(e) => {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("password") || err_str.contains("encrypted") {
                    Err(Error::Extract(ExtractError::WrongPassword {
                        archive: archive_path.to_path_buf(),
                    }))
                } else {
                    Err(Error::Extract(ExtractError::Failed {
                        archive: archive_path.to_path_buf(),
                        reason: format!("failed to extract 7z archive: {}", e),
                    }))
                }
            }
        }
    }

    /// Validate that all extracted files are within the destination directory
    fn validate_extracted_paths(dest_path: &Path) -> Result<()> {
        let canonical_dest = dest_path.canonicalize().map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to canonicalize destination path: {}",
                e
            )))
        })?;

        for entry in walkdir::WalkDir::new(dest_path) {
            let entry = entry
                .map_err(|e| Error::Io(std::io::Error::other(format!("failed to read entry: {}", e))))?;
            let canonical = entry.path().canonicalize().map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "failed to canonicalize extracted path: {}",
                    e
                )))
            })?;

            if !canonical.starts_with(&canonical_dest) {
                return Err(Error::Extract(ExtractError::Failed {
                    archive: dest_path.to_path_buf(),
                    reason: format!("extracted path escapes destination: {}", canonical.display()),
                }));
            }
        }

        Ok(())
    }

    /// Collect all regular files under `dir`
    fn collect_extracted_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry
                .map_err(|e| Error::Io(std::io::Error::other(format!("failed to read entry: {}", e))))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}
