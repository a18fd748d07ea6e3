//! Archive expansion and cleanup tests.

mod support;

use std::fs;

use frameset::{ArchiveFormat, DatasetError, archive::has_archive_extension, clean, expand, unpack_destination};

#[test]
fn expand_into_sibling_directory() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let archive = temporary_directory.path().join("game_1.zip");
    fs::write(
        &archive,
        support::zip_bytes(&[
            ("events_markup.json", r#"{"10": "goal"}"#),
            ("notes/readme.txt", "hello"),
        ]),
    )
    .expect("Failed to write archive");

    let destination = expand(&archive).expect("Failed to expand archive");
    assert_eq!(destination, temporary_directory.path().join("game_1"));
    assert_eq!(
        fs::read_to_string(destination.join("events_markup.json")).expect("Missing entry"),
        r#"{"10": "goal"}"#
    );
    assert_eq!(
        fs::read_to_string(destination.join("notes/readme.txt")).expect("Missing nested entry"),
        "hello"
    );
    assert!(archive.exists(), "Expanding must not delete the archive");
}

#[test]
fn corrupt_archive() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let archive = temporary_directory.path().join("broken.zip");
    fs::write(&archive, b"definitely not a zip file").expect("Failed to write archive");

    match expand(&archive) {
        Err(DatasetError::Unpack { path, .. }) => assert_eq!(path, archive),
        other => panic!("Expected Unpack, got {other:?}"),
    }
}

#[test]
fn missing_archive() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = expand(&temporary_directory.path().join("absent.zip"));
    assert!(matches!(result, Err(DatasetError::Unpack { .. })));
}

#[test]
fn unsupported_format() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let archive = temporary_directory.path().join("game_1.rar");
    fs::write(&archive, b"rar").expect("Failed to write archive");

    let error = expand(&archive).expect_err("Unsupported format should fail");
    assert!(error.to_string().contains("unsupported archive format"));
    assert_eq!(ArchiveFormat::from_path(&archive), None);
    assert_eq!(
        ArchiveFormat::from_path("x/GAME.ZIP".as_ref()),
        Some(ArchiveFormat::Zip)
    );
}

#[test]
fn destination_strips_extension() {
    assert_eq!(
        unpack_destination("data/train/annotations/game_3.zip".as_ref()),
        std::path::Path::new("data/train/annotations/game_3")
    );
}

#[test]
fn clean_removes_only_archives() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let archive = temporary_directory.path().join("game_1.zip");
    let video = temporary_directory.path().join("game_1.mp4");
    fs::write(&archive, b"zip").expect("Failed to write archive");
    fs::write(&video, b"mp4").expect("Failed to write video");

    let removed = clean([&archive, &video]).expect("Cleanup failed");
    assert_eq!(removed, 1);
    assert!(!archive.exists());
    assert!(video.exists(), "Non-archives must be kept");

    let removed = clean([&archive]).expect("Second cleanup failed");
    assert_eq!(removed, 0, "Already-removed archives are skipped");
}

#[test]
fn uppercase_archives_expand_and_clean() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let archive = temporary_directory.path().join("GAME_2.ZIP");
    fs::write(&archive, support::zip_bytes(&[("events_markup.json", "{}")]))
        .expect("Failed to write archive");

    assert!(has_archive_extension(&archive));
    let destination = expand(&archive).expect("Failed to expand archive");
    assert!(destination.join("events_markup.json").is_file());

    assert_eq!(clean([&archive]).expect("Cleanup failed"), 1);
    assert!(!archive.exists());
}
