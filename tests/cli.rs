//! Command-line tests against the built `frameset` binary.

use std::{fs, path::Path, process::Command};

use frameset::{ExtractionSummary, ensure_layout};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn frameset() -> Command {
    Command::new(env!("CARGO_BIN_EXE_frameset"))
}

#[test]
fn extract_reports_every_failed_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temporary_directory.path();
    ensure_layout(root).expect("Failed to create layout");
    fs::write(root.join("train/videos/game_1.mp4"), b"garbage").expect("Failed to write video");
    fs::write(root.join("test/videos/test_1.mp4"), b"garbage").expect("Failed to write video");

    let output = frameset()
        .arg("extract")
        .arg(root)
        .args(["--workers", "2"])
        .output()
        .expect("Failed to run frameset");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("game_1.mp4"), "Missing game_1 failure: {stderr}");
    assert!(stderr.contains("test_1.mp4"), "Missing test_1 failure: {stderr}");
    assert!(stderr.contains("2 of 2 video(s) failed"), "Unexpected summary: {stderr}");
}

#[test]
fn extract_video_fails_on_invalid_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let video = temporary_directory.path().join("broken.mp4");
    fs::write(&video, b"this is not a media file").expect("Failed to write video");

    let output = frameset()
        .arg("extract-video")
        .arg(&video)
        .output()
        .expect("Failed to run frameset");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open video"));
}

#[test]
fn rejects_zero_cutoff() {
    let output = frameset()
        .args(["extract", "data", "--frame-cutoff", "0"])
        .output()
        .expect("Failed to run frameset");
    assert!(!output.status.success());
}

#[test]
fn isolated_extraction_matches_in_process() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let mut frame_counts = Vec::new();
    for mode in [None, Some("--in-process")] {
        let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temporary_directory.path();
        ensure_layout(root).expect("Failed to create layout");
        fs::copy(SAMPLE_VIDEO, root.join("train/videos/game_1.mp4")).expect("Failed to copy fixture");

        let output = frameset()
            .arg("extract")
            .arg(root)
            .args(mode)
            .output()
            .expect("Failed to run frameset");
        assert!(
            output.status.success(),
            "extract failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let written = fs::read_dir(root.join("train/images/game_1"))
            .expect("Missing output directory")
            .count();
        frame_counts.push(written);
    }

    assert!(frame_counts[0] > 0);
    assert_eq!(frame_counts[0], frame_counts[1]);
}

#[test]
fn extract_video_prints_summary() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temporary_directory.path();
    ensure_layout(root).expect("Failed to create layout");
    let video = root.join("test/videos/test_1.mp4");
    fs::copy(SAMPLE_VIDEO, &video).expect("Failed to copy fixture");
    fs::create_dir(root.join("test/images/test_1")).expect("Failed to create output dir");

    let output = frameset()
        .arg("extract-video")
        .arg(&video)
        .output()
        .expect("Failed to run frameset");
    assert!(output.status.success());

    let summary = ExtractionSummary::from_json(&output.stdout).expect("Unreadable summary");
    assert_eq!(summary.output_directory, root.join("test/images/test_1"));
    assert_eq!(summary.frames_written, summary.frames_decoded);
}
