//! HLS manifest variant resolution.
//!
//! A master playlist yields one selectable [`StreamVariant`] per rendition,
//! labeled by resolution height when advertised, bandwidth otherwise. A
//! media (leaf) playlist yields a single `Auto` variant pointing at the
//! original URL. Variant URIs are absolutized against the manifest URL so
//! the remux step can hand them straight to the media tool.

use crate::download::HttpFetcher;
use crate::error::{Error, InputError, Result};
use crate::types::StreamVariant;
use m3u8_rs::Playlist;
use tracing::debug;
use url::Url;

/// Parse manifest bytes into the selectable variant list.
///
/// `manifest_url` is the URL the bytes were fetched from; relative variant
/// URIs are resolved against it.
pub fn parse_variants(manifest_url: &str, bytes: &[u8]) -> Result<Vec<StreamVariant>> {
    let playlist = m3u8_rs::parse_playlist_res(bytes).map_err(|e| {
        Error::Input(InputError::BadManifest {
            url: manifest_url.to_string(),
            reason: e.to_string(),
        })
    })?;

    match playlist {
        Playlist::MasterPlaylist(master) => {
            let mut variants = Vec::with_capacity(master.variants.len());
            for variant in &master.variants {
                let label = if let Some(resolution) = &variant.resolution {
                    format!("{}p", resolution.height)
                } else if variant.bandwidth > 0 {
                    format!("{}kbps", variant.bandwidth / 1000)
                } else {
                    "Variant".to_string()
                };

                variants.push(StreamVariant {
                    label,
                    url: absolutize(manifest_url, &variant.uri),
                });
            }

            if variants.is_empty() {
                return Err(Error::Input(InputError::BadManifest {
                    url: manifest_url.to_string(),
                    reason: "master playlist advertises no variants".to_string(),
                }));
            }

            debug!(url = %manifest_url, count = variants.len(), "resolved master playlist variants");
            Ok(variants)
        }
        Playlist::MediaPlaylist(_) => Ok(vec![StreamVariant {
            label: "Auto".to_string(),
            url: manifest_url.to_string(),
        }]),
    }
}

/// Fetch a manifest and resolve its variants
pub async fn resolve_variants(fetcher: &HttpFetcher, url: &str) -> Result<Vec<StreamVariant>> {
    let bytes = fetcher.fetch_bytes(url).await?;
    parse_variants(url, &bytes)
}

/// Output base name for a manifest URL: the last path segment without its
/// `.m3u8` suffix, or `stream` when the URL has no usable tail
#[must_use]
pub fn base_name_for(manifest_url: &str) -> String {
    Url::parse(manifest_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .map(|tail| tail.trim_end_matches(".m3u8").to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "stream".to_string())
}

fn absolutize(manifest_url: &str, uri: &str) -> String {
    match Url::parse(manifest_url).and_then(|base| base.join(uri)) {
        Ok(absolute) => absolute.to_string(),
        // Already absolute, or an unparseable base; pass through untouched
        Err(_) => uri.to_string(),
    }
}
