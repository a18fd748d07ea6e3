//! HTTP download tests against an in-process server.

mod support;

use std::{collections::HashMap, fs, net::TcpListener};

use frameset::DatasetError;
use support::{Route, local_fetcher, serve};

fn entry_count(directory: &std::path::Path) -> usize {
    fs::read_dir(directory).expect("Failed to list directory").count()
}

#[test]
fn fetch_writes_body() {
    let body: Vec<u8> = (0..64 * 1024).map(|value| (value % 251) as u8).collect();
    let base_url = serve(HashMap::from([("/game_1.mp4".to_string(), Route::ok(body.clone()))]));

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = temporary_directory.path().join("game_1.mp4");

    let bytes = local_fetcher()
        .fetch(&format!("{base_url}/game_1.mp4"), &destination)
        .expect("Download failed");

    assert_eq!(bytes, body.len() as u64);
    assert_eq!(fs::read(&destination).expect("Missing download"), body);
    assert_eq!(entry_count(temporary_directory.path()), 1, "No partial files remain");
}

#[test]
fn fetch_replaces_existing_file() {
    let base_url = serve(HashMap::from([("/a.zip".to_string(), Route::ok("fresh"))]));
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = temporary_directory.path().join("a.zip");
    fs::write(&destination, "stale").expect("Failed to write stale file");

    local_fetcher()
        .fetch(&format!("{base_url}/a.zip"), &destination)
        .expect("Download failed");
    assert_eq!(fs::read_to_string(&destination).expect("Missing download"), "fresh");
}

#[test]
fn error_status_leaves_no_file() {
    let base_url = serve(HashMap::from([("/gone.mp4".to_string(), Route::status(500))]));
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");

    for name in ["missing.mp4", "gone.mp4"] {
        let url = format!("{base_url}/{name}");
        let destination = temporary_directory.path().join(name);

        match local_fetcher().fetch(&url, &destination) {
            Err(DatasetError::Transfer { url: reported, .. }) => assert_eq!(reported, url),
            other => panic!("Expected Transfer, got {other:?}"),
        }
        assert!(!destination.exists());
    }
    assert_eq!(entry_count(temporary_directory.path()), 0);
}

#[test]
fn truncated_body_leaves_no_file() {
    let base_url = serve(HashMap::from([(
        "/cut.mp4".to_string(),
        Route::truncated(vec![7_u8; 32 * 1024]),
    )]));
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = temporary_directory.path().join("cut.mp4");

    let result = local_fetcher().fetch(&format!("{base_url}/cut.mp4"), &destination);
    assert!(
        matches!(result, Err(DatasetError::Transfer { .. })),
        "Expected Transfer, got {result:?}"
    );
    assert!(!destination.exists());
    assert_eq!(entry_count(temporary_directory.path()), 0, "Partial file must be removed");
}

#[test]
fn connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let address = listener.local_addr().expect("Failed to read address");
    drop(listener);

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = local_fetcher().fetch(
        &format!("http://{address}/game_1.zip"),
        &temporary_directory.path().join("game_1.zip"),
    );
    assert!(matches!(result, Err(DatasetError::Transfer { .. })));
}

#[test]
fn missing_destination_directory() {
    let base_url = serve(HashMap::from([("/a.zip".to_string(), Route::ok("data"))]));
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = temporary_directory.path().join("absent").join("a.zip");

    let result = local_fetcher().fetch(&format!("{base_url}/a.zip"), &destination);
    assert!(matches!(result, Err(DatasetError::Transfer { .. })));
}
