use crate::db::*;
use std::path::Path;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_register_and_expire_temp_paths() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id_old = db
        .register_temp_path(1, Path::new("/tmp/botload/1/aaa"), 1000)
        .await
        .unwrap();
    let id_new = db
        .register_temp_path(1, Path::new("/tmp/botload/1/bbb"), 2000)
        .await
        .unwrap();
    assert_ne!(id_old, id_new);

    // Only the resource whose expiry has passed is returned
    let expired = db.expired_temp_paths(1500).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, id_old);
    assert_eq!(expired[0].path, "/tmp/botload/1/aaa");

    // Expiry boundary is inclusive
    let expired = db.expired_temp_paths(2000).await.unwrap();
    assert_eq!(expired.len(), 2);

    db.close().await;
}

#[tokio::test]
async fn test_delete_temp_paths_removes_rows() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let a = db
        .register_temp_path(5, Path::new("/tmp/a"), 100)
        .await
        .unwrap();
    let b = db
        .register_temp_path(5, Path::new("/tmp/b"), 100)
        .await
        .unwrap();

    db.delete_temp_paths(&[a]).await.unwrap();

    let remaining = db.all_temp_paths().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b);

    db.close().await;
}
