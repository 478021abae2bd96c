//! HTTP download pipeline
//!
//! [`HttpFetcher`] streams one URL to disk with rate-limited progress;
//! [`run_batch`] drives a categorized link set through it sequentially,
//! counting successes and failures so every non-manifest item lands in
//! exactly one counter. Streaming manifests are never fetched here; they are
//! collected for the variant-selection flow.

mod http;

pub use http::HttpFetcher;

use crate::drive;
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::types::{BatchReport, LinkCategory, LinkMap};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Download a categorized link set into `dest_dir`, one item at a time.
///
/// Processing order: cloud-drive links (rewritten to direct URLs) first,
/// then direct and unknown links, in their original order within each
/// group. Platform-internal links are ignored. A cloud-drive link that
/// cannot be rewritten counts as a failure without touching the network.
///
/// Cancellation is checked between items; [`crate::Error::Cancelled`] is
/// returned with the partial report discarded by the caller's task flow.
pub async fn run_batch(
    fetcher: &HttpFetcher,
    links: &LinkMap,
    dest_dir: &Path,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
    progress_interval: Duration,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    if let Some(manifests) = links.get(&LinkCategory::StreamingManifest) {
        report.manifests = manifests.clone();
    }

    let cloud = links
        .get(&LinkCategory::CloudDrive)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let plain = [LinkCategory::Direct, LinkCategory::Unknown]
        .iter()
        .filter_map(|c| links.get(c))
        .flatten();

    for url in cloud {
        check_cancel(cancel)?;
        match drive::direct_download_url(url) {
            Some(direct) => {
                fetch_one(fetcher, &direct, dest_dir, sink, progress_interval, &mut report).await;
            }
            None => {
                warn!(url = %url, "cloud-drive link carries no file id, counting as failed");
                report.fail += 1;
            }
        }
    }

    for url in plain {
        check_cancel(cancel)?;
        fetch_one(fetcher, url, dest_dir, sink, progress_interval, &mut report).await;
    }

    info!(
        ok = report.ok,
        fail = report.fail,
        manifests = report.manifests.len(),
        "batch download finished"
    );

    Ok(report)
}

fn check_cancel(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(crate::Error::Cancelled);
    }
    Ok(())
}

async fn fetch_one(
    fetcher: &HttpFetcher,
    url: &str,
    dest_dir: &Path,
    sink: &dyn ProgressSink,
    progress_interval: Duration,
    report: &mut BatchReport,
) {
    match fetcher.download(url, dest_dir, sink, progress_interval).await {
        Ok(path) => {
            report.ok += 1;
            report.files.push(path);
        }
        Err(e) => {
            // One bad link must not sink the rest of the batch
            warn!(url = %url, error = %e, "download failed");
            report.fail += 1;
        }
    }
}
