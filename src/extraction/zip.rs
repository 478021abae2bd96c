use crate::error::{Error, ExtractError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Whether any entry in the archive is encrypted
    pub fn probe_encrypted(archive_path: &Path) -> Result<bool> {
        let file = std::fs::File::open(archive_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to open ZIP archive: {}",
                e
            )))
        })?;

        let mut archive = match zip::ZipArchive::new(file) {
            Ok(archive) => archive,
            // An unreadable archive is not "encrypted"; extraction will
            // surface the real failure
            Err(_) => return Ok(false),
        };

        for i in 0..archive.len() {
            if let Err(e) = archive.by_index(i) {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("password") || err_str.contains("encrypted") {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Open a ZIP entry by index, handling password decryption if needed
    fn open_zip_entry<'a>(
        archive: &'a mut zip::ZipArchive<std::fs::File>,
        index: usize,
        password: &str,
        archive_path: &Path,
    ) -> Result<zip::read::ZipFile<'a>> {
        if password.is_empty() {
            archive.by_index(index).map_err(|e| {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("password") || err_str.contains("encrypted") {
                    Error::Extract(ExtractError::WrongPassword {
                        archive: archive_path.to_path_buf(),
                    })
                } else {
                    Error::Extract(ExtractError::Failed {
                        archive: archive_path.to_path_buf(),
                        reason: format!("failed to read ZIP entry: {}", e),
                    })
                }
            })
        } else {
            archive
                .by_index_decrypt(index, password.as_bytes())
                .map_err(|e| {
                    let err_str = e.to_string().to_lowercase();
                    if err_str.contains("password") || err_str.contains("encrypted") {
                        Error::Extract(ExtractError::WrongPassword {
                            archive: archive_path.to_path_buf(),
                        })
                    } else {
                        Error::Extract(ExtractError::Failed {
                            archive: archive_path.to_path_buf(),
                            reason: format!("failed to read ZIP entry: {}", e),
                        })
                    }
                })?
                .map_err(|_| {
                    Error::Extract(ExtractError::WrongPassword {
                        archive: archive_path.to_path_buf(),
                    })
                })
        }
    }

    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>> {
        // Entries with unsafe paths (absolute, "..") are skipped entirely
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!("skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "failed to create directory: {}",
                    e
                )))
            })?;
            Ok(None)
        } else {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "failed to create parent directories: {}",
                        e
                    )))
                })?;
            }

            let mut outfile = std::fs::File::create(&file_path).map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "failed to create output file: {}",
                    e
                )))
            })?;

            std::io::copy(&mut file, &mut outfile).map_err(|e| {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("password") || err_str.contains("encrypted") {
                    Error::Extract(ExtractError::WrongPassword {
                        archive: archive_path.to_path_buf(),
                    })
                } else {
                    Error::Io(std::io::Error::other(format!(
                        "failed to extract file: {}",
                        e
                    )))
                }
            })?;

            Ok(Some(file_path))
        }
    }

    /// Try to extract a ZIP archive with a single password
    pub fn try_extract(
        archive_path: &Path,
        password: &str,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            ?archive_path,
            password_length = password.len(),
            ?dest_path,
            "attempting ZIP extraction"
        );

        std::fs::create_dir_all(dest_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        let file = std::fs::File::open(archive_path).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to open ZIP archive: {}",
                e
            )))
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            Error::Extract(ExtractError::Failed {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP archive: {}", e),
            })
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let file = Self::open_zip_entry(&mut archive, i, password, archive_path)?;

            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}
