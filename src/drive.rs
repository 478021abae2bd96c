//! Cloud-drive share-link rewriting.
//!
//! Share links come in several shapes (`/file/d/<id>/view`, `?id=<id>`,
//! `/open?id=<id>`); all of them carry a file id that can be turned into a
//! direct `uc?export=download` fetch URL. Links that carry no recognizable
//! file id (folders, doc viewers) return `None` and are counted as failures
//! by the batch pipeline without touching the network.

use url::Url;

/// Rewrite a cloud-drive share URL into a direct-download URL.
///
/// Returns `None` when no file id can be recovered from the link.
#[must_use]
pub fn direct_download_url(share_url: &str) -> Option<String> {
    let parsed = Url::parse(share_url).ok()?;
    let id = file_id(&parsed)?;
    Some(format!(
        "https://drive.google.com/uc?export=download&id={}",
        id
    ))
}

fn file_id(url: &Url) -> Option<String> {
    // /file/d/<id>/... path form
    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    if let Some(pos) = segments
        .windows(2)
        .position(|w| w[0] == "file" && w[1] == "d")
    {
        if let Some(id) = segments.get(pos + 2).filter(|id| !id.is_empty()) {
            return Some((*id).to_string());
        }
    }

    // ?id=<id> query form, covers /open?id= and /uc?id=
    url.query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .filter(|id| !id.is_empty())
}
