//! End-to-end task flow over the public API: link registration, batch
//! download with a mock HTTP server, manifest resolution, and variant
//! materialization through a stubbed media tool.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use botload::media::MediaTool;
use botload::{Config, Error, LinkCategory, NativeCodec, NullSink, TaskEngine};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StubMediaTool;

#[async_trait]
impl MediaTool for StubMediaTool {
    async fn remux_stream_copy(&self, src: &str, dest: &Path) -> botload::Result<()> {
        tokio::fs::write(dest, format!("remux of {src}")).await?;
        Ok(())
    }

    async fn demux_audio(&self, _video: &Path, dest: &Path) -> botload::Result<()> {
        tokio::fs::write(dest, b"audio").await?;
        Ok(())
    }
}

async fn engine_in(dir: &TempDir) -> TaskEngine {
    let mut config = Config::default();
    config.storage.temp_dir = dir.path().join("temp");
    config.storage.db_path = dir.path().join("flow.db");
    TaskEngine::with_tools(config, Arc::new(NativeCodec), Some(Arc::new(StubMediaTool)))
        .await
        .unwrap()
}

const MASTER_PLAYLIST: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1920x1080\n\
1080/index.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n\
360/index.m3u8\n";

#[tokio::test]
async fn links_to_variant_materialization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pdf bytes".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/broken.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/live/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MASTER_PLAYLIST))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir).await;

    let text = format!(
        "course files: {0}/files/doc.pdf and {0}/files/broken.zip plus stream {0}/live/master.m3u8",
        server.uri()
    );
    let batch = engine.register_links(42, &text).unwrap();
    engine.sessions().put_link_batch((1, 1), batch.clone());

    // The pdf has no direct-download extension; it still downloads through
    // the unknown fail-open path
    assert_eq!(batch.links[&LinkCategory::Unknown].len(), 1);
    assert_eq!(batch.links[&LinkCategory::Direct].len(), 1);

    let outcome = engine.run_link_batch(42, &batch.links, &NullSink).await.unwrap();

    assert_eq!(outcome.report.ok, 1);
    assert_eq!(outcome.report.fail, 1);
    assert_eq!(outcome.report.manifests.len(), 1);
    assert_eq!(outcome.stream_tasks.len(), 1);

    let task = &outcome.stream_tasks[0];
    assert_eq!(task.variants.len(), 2);
    assert_eq!(task.variants[0].label, "1080p");
    assert_eq!(task.variants[1].label, "360p");
    assert_eq!(task.base_name, "master");

    // Pick the low variant; the output lands in the batch's scratch dir
    let out = engine.materialize_variant(42, &task.id, 1).await.unwrap();
    assert!(out.exists());
    assert!(out.ends_with("master_360p.mp4"));

    // The selection task was consumed
    match engine.materialize_variant(42, &task.id, 1).await {
        Err(Error::TaskNotFound(_)) => {}
        other => panic!("expected TaskNotFound, got {other:?}"),
    }

    // Two tasks recorded for the user, slot free again
    let user = engine.database().get_or_create_user(42).await.unwrap();
    assert_eq!(user.total_tasks, 2);
    assert!(!engine.is_busy(42));

    // Full cleanup removes every scratch path the flow created
    let report = engine.sweep_all().await.unwrap();
    assert!(report.removed >= 1);
    assert_eq!(report.failed, 0);
    assert!(!out.exists());
}

#[tokio::test]
async fn busy_user_is_rejected_until_slot_frees() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in(&dir).await;

    let held = engine.coordinator().try_begin(7).unwrap();

    let batch = engine
        .register_links(7, "https://example.com/file.mp4")
        .unwrap();
    match engine.run_link_batch(7, &batch.links, &NullSink).await {
        Err(Error::Busy(7)) => {}
        other => panic!("expected Busy, got {other:?}"),
    }

    drop(held);
    assert!(!engine.is_busy(7));
}
