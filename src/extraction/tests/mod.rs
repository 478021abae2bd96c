use super::*;
use crate::error::{Error, ExtractError, InputError};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
// Leading :: because the glob above pulls in the sibling zip module
use ::zip::unstable::write::FileOptionsExt;
use ::zip::write::FileOptions;

fn write_plain_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(name.trim_end_matches('/'), FileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
    }
    writer.finish().unwrap();
}

fn write_encrypted_zip(path: &Path, password: &str, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options = FileOptions::default().with_deprecated_encryption(password.as_bytes());
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn detect_archive_type_by_extension() {
    assert_eq!(detect_archive_type(Path::new("a.ZIP")), Some(ArchiveType::Zip));
    assert_eq!(detect_archive_type(Path::new("a.7z")), Some(ArchiveType::SevenZ));
    assert_eq!(detect_archive_type(Path::new("a.rar")), Some(ArchiveType::Rar));
    assert_eq!(detect_archive_type(Path::new("a.r00")), Some(ArchiveType::Rar));
    assert_eq!(detect_archive_type(Path::new("a.tar.gz")), None);
    assert!(is_archive(Path::new("a.zip")));
    assert!(!is_archive(Path::new("a.txt")));
}

#[tokio::test]
async fn unsupported_archive_is_an_input_error() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("payload.xyz");
    std::fs::write(&bogus, b"not an archive").unwrap();

    let result = run_extraction(&NativeCodec, &bogus, &dir.path().join("out"), None).await;
    match result {
        Err(Error::Input(InputError::UnsupportedArchive { path })) => {
            assert_eq!(path, bogus);
        }
        other => panic!("expected UnsupportedArchive, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_zip_pipeline_builds_stats_and_sorted_listing() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("course.zip");
    write_plain_zip(
        &archive,
        &[
            ("media/", b"" as &[u8]),
            ("media/Clip.mp4", b"fake video bytes"),
            ("media/b.jpg", b"jpg2"),
            ("a.jpg", b"jpg1"),
            ("c.jpg", b"jpg3"),
            (
                "links.txt",
                b"https://example.com/x.mp4\nhttps://drive.google.com/file/d/id1/view\n",
            ),
        ],
    );

    let dest = dir.path().join("out");
    let result = run_extraction(&NativeCodec, &archive, &dest, None)
        .await
        .unwrap();

    assert_eq!(result.stats.total_files, 5);
    assert_eq!(result.stats.videos, 1);
    assert_eq!(result.stats.txt, 1);
    assert_eq!(result.stats.others, 3);
    assert_eq!(result.stats.folders, 1);
    assert_eq!(result.stats.category_sum(), result.stats.total_files);

    // Case-insensitive lexicographic order of relative paths
    let mut expected = result.files.clone();
    expected.sort_by_key(|f| f.to_lowercase());
    assert_eq!(result.files, expected);
    assert!(result.files.contains(&"a.jpg".to_string()));
    assert_eq!(result.base_dir, dest);

    // The extracted tree is scannable for links afterwards
    let links = crate::links::scan_links_in_tree(&dest);
    assert_eq!(links.values().map(Vec::len).sum::<usize>(), 2);
}

#[tokio::test]
async fn encrypted_zip_without_password_asks_for_one() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("locked.zip");
    write_encrypted_zip(&archive, "s3cret", &[("inner.txt", b"hello")]);

    assert!(NativeCodec.probe_encrypted(&archive).await.unwrap());

    let result = run_extraction(&NativeCodec, &archive, &dir.path().join("out"), None).await;
    match result {
        Err(Error::Extract(ExtractError::PasswordRequired { .. })) => {}
        other => panic!("expected PasswordRequired, got {other:?}"),
    }
    // Nothing was written before the failure
    assert!(!dir.path().join("out").join("inner.txt").exists());
}

#[tokio::test]
async fn encrypted_zip_with_correct_password_extracts() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("locked.zip");
    write_encrypted_zip(&archive, "s3cret", &[("inner.txt", b"hello")]);

    let dest = dir.path().join("out");
    let result = run_extraction(&NativeCodec, &archive, &dest, Some("s3cret"))
        .await
        .unwrap();

    assert_eq!(result.stats.total_files, 1);
    assert_eq!(result.stats.txt, 1);
    assert_eq!(std::fs::read(dest.join("inner.txt")).unwrap(), b"hello");
}

#[tokio::test]
async fn encrypted_zip_with_wrong_password_fails() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("locked.zip");
    write_encrypted_zip(&archive, "s3cret", &[("inner.txt", b"hello")]);

    let result = run_extraction(
        &NativeCodec,
        &archive,
        &dir.path().join("out"),
        Some("wrong-password"),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn traversal_entries_are_skipped() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("evil.zip");
    write_plain_zip(
        &archive,
        &[("../escape.txt", b"nope" as &[u8]), ("ok.txt", b"fine")],
    );

    let dest = dir.path().join("nest").join("out");
    std::fs::create_dir_all(&dest).unwrap();
    let result = run_extraction(&NativeCodec, &archive, &dest, None)
        .await
        .unwrap();

    assert_eq!(result.stats.total_files, 1);
    assert!(dest.join("ok.txt").exists());
    assert!(!dir.path().join("nest").join("escape.txt").exists());
}

#[tokio::test]
async fn plain_zip_probe_reports_unencrypted() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("plain.zip");
    write_plain_zip(&archive, &[("a.txt", b"x")]);

    assert!(!NativeCodec.probe_encrypted(&archive).await.unwrap());
}
