//! Streaming HTTP fetch with filename resolution.

use crate::error::Result;
use crate::progress::{ProgressReporter, ProgressSink};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// HTTP client wrapper that streams single URLs to disk
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher, optionally with a whole-request timeout.
    ///
    /// Large downloads routinely outlive any reasonable timeout, so `None`
    /// is the default configuration.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Stream `url` into `dest_dir`, returning the written file path.
    ///
    /// The filename is resolved in priority order: `Content-Disposition`
    /// header (RFC 5987 `filename*=` then plain `filename=`), the last URL
    /// path segment, then a generated `file_<hex>` fallback. An existing file of
    /// the same name is never overwritten; a unique prefix is added instead.
    pub async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        sink: &dyn ProgressSink,
        progress_interval: Duration,
    ) -> Result<PathBuf> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let file_name = resolve_filename(&response, url);
        let total = response.content_length();
        let dest = unique_path(dest_dir, &file_name);

        debug!(url = %url, file_name = %file_name, ?total, "starting download");

        tokio::fs::create_dir_all(dest_dir).await?;
        let mut file = tokio::fs::File::create(&dest).await?;

        let mut reporter = ProgressReporter::new(&file_name, total, progress_interval);
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let Some(update) = reporter.update(written) {
                sink.emit(&update).await;
            }
        }

        file.flush().await?;

        // Final snapshot for length-less responses
        if total.is_none()
            && let Some(update) = reporter.update(written)
        {
            sink.emit(&update).await;
        }

        info!(url = %url, path = ?dest, bytes = written, "download complete");
        Ok(dest)
    }

    /// Fetch a small resource (a playlist manifest) fully into memory
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Resolve the output filename for a response
fn resolve_filename(response: &reqwest::Response, url: &str) -> String {
    if let Some(content_disposition) = response.headers().get("content-disposition")
        && let Ok(value) = content_disposition.to_str()
        && let Some(name) = filename_from_disposition(value)
    {
        return name;
    }

    // Fall back to the last URL path segment
    if let Ok(parsed_url) = url::Url::parse(url)
        && let Some(mut segments) = parsed_url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
    {
        if let Ok(decoded) = urlencoding::decode(last_segment) {
            return sanitize_filename(&decoded);
        }
        return sanitize_filename(last_segment);
    }

    // Last resort fallback
    format!("file_{:08x}", rand::random::<u32>())
}

/// Parse `filename*=` / `filename=` out of a Content-Disposition value.
///
/// The RFC 5987 extended parameter wins when both are present; servers put
/// the ASCII-mangled fallback in the plain one.
fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for part in value.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            // RFC 5987: charset'lang'encoded-filename
            if let Some(idx) = encoded.rfind('\'')
                && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
                && !decoded.is_empty()
            {
                extended = Some(sanitize_filename(&decoded));
            }
        } else if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim_matches('"');
            if !name.is_empty() {
                plain = Some(sanitize_filename(name));
            }
        }
    }
    extended.or(plain)
}

/// Strip any path components a hostile header could smuggle in
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .to_string();
    if base.is_empty() || base == "." || base == ".." {
        format!("file_{:08x}", rand::random::<u32>())
    } else {
        base
    }
}

/// Pick a path under `dest_dir` that doesn't collide with an existing file
fn unique_path(dest_dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dest_dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    dest_dir.join(format!("{:04x}_{}", rand::random::<u16>(), file_name))
}
