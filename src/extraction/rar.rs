use crate::error::{Error, ExtractError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Archive extractor for RAR files
pub struct RarExtractor;

impl RarExtractor {
    /// Whether the archive demands a password to open.
    ///
    /// Walks the listing headers; header-encrypted archives fail the walk
    /// with a password error.
    pub fn probe_encrypted(archive_path: &Path) -> Result<bool> {
        let archive = unrar::Archive::new(archive_path);

        let listing = match archive.open_for_listing() {
            Ok(listing) => listing,
            Err(e) => return Ok(Self::is_password_error(&e.to_string())),
        };

        for entry in listing {
            if let Err(e) = entry {
                if Self::is_password_error(&e.to_string()) {
                    return Ok(true);
                }
                // Any other listing failure is extraction's problem
                break;
            }
        }

        Ok(false)
    }

    /// Check if an unrar error indicates a password problem
    fn is_password_error(error_msg: &str) -> bool {
        let msg = error_msg.to_lowercase();
        msg.contains("password") || msg.contains("encrypted")
    }

    /// Convert an unrar error to our error type, checking for password errors
    fn convert_unrar_error(e: unrar::error::UnrarError, archive_path: &Path) -> Error {
        let err_str = e.to_string();
        if Self::is_password_error(&err_str) {
            Error::Extract(ExtractError::WrongPassword {
                archive: archive_path.to_path_buf(),
            })
        } else {
            Error::Extract(ExtractError::Failed {
                archive: archive_path.to_path_buf(),
                reason: err_str,
            })
        }
    }

    /// Try to extract a RAR archive with a single password
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting RAR extraction"
        );

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        let archive = if password.is_empty() {
            unrar::Archive::new(archive_path)
        } else {
            unrar::Archive::with_password(archive_path, password.as_bytes())
        };

        let processor = archive
            .open_for_processing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path))?;

        let mut extracted_files = Vec::new();

        // Process each entry using the state machine interface
        let mut at_header = processor;
        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break,
                Err(e) => return Err(Self::convert_unrar_error(e, archive_path)),
            };

            let header = at_file.entry();

            // Sanitize filename to prevent path traversal attacks (e.g., "../../../etc/passwd")
            let sanitized = Path::new(&header.filename)
                .components()
                .filter(|c| matches!(c, std::path::Component::Normal(_)))
                .collect::<PathBuf>();

            if sanitized.as_os_str().is_empty() {
                at_header = at_file.skip().map_err(|e| {
                    Error::Extract(ExtractError::Failed {
                        archive: archive_path.to_path_buf(),
                        reason: format!("failed to skip unsafe entry: {}", e),
                    })
                })?;
                continue;
            }

            let file_path = dest_path.join(&sanitized);

            if !header.is_directory() {
                at_header = at_file
                    .extract_to(&file_path)
                    .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
                extracted_files.push(file_path);
            } else {
                at_header = at_file.skip().map_err(|e| {
                    Error::Extract(ExtractError::Failed {
                        archive: archive_path.to_path_buf(),
                        reason: format!("failed to skip directory: {}", e),
                    })
                })?;
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "RAR extraction successful"
        );

        Ok(extracted_files)
    }
}
