//! End-to-end tests for the FFmpeg CLI frame extractor
//!
//! Tests that need a real video generate one with `ffmpeg`'s test source and are
//! skipped when `ffmpeg` is not on PATH.

use drone_locate_frame::{FfmpegCliExtractor, FrameExtractor};
use std::path::Path;
use std::process::Command;

fn ffmpeg_available() -> bool {
    let ok = |bin: &str| {
        Command::new(bin)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    };
    ok("ffmpeg") && ok("ffprobe")
}

/// Write a `frames`-frame test pattern video to `path`
fn make_test_video(path: &Path, frames: u32) -> bool {
    Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size=64x48:rate=10:duration={}", f64::from(frames) / 10.0))
        .args(["-frames:v", &frames.to_string(), "-pix_fmt", "yuv420p", "-c:v", "mpeg4"])
        .arg(path)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Write a 10-frame video whose frame `n` is a flat grey of luma `n * 25`
fn make_graded_video(path: &Path) -> bool {
    Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg("color=c=black:size=64x48:rate=10:duration=1,format=yuv420p,geq=lum=N*25:cb=128:cr=128")
        .args(["-frames:v", "10", "-pix_fmt", "yuv420p", "-c:v", "mpeg4", "-q:v", "1"])
        .arg(path)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn mean_luma(path: &Path) -> f64 {
    let grey = image::open(path).unwrap().to_luma8();
    let sum: u64 = grey.pixels().map(|p| u64::from(p.0[0])).sum();
    sum as f64 / f64::from(grey.width() * grey.height())
}

#[test]
fn test_corrupt_video_reports_failure_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("broken.mp4");
    std::fs::write(&video, b"definitely not an mp4 container").unwrap();
    let dest = dir.path().join("frame.jpg");

    let result = FfmpegCliExtractor::default().extract_middle_frame(&video, &dest);

    assert!(result.is_err());
    assert!(!dest.exists());
}

#[test]
fn test_missing_video_reports_failure_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("frame.jpg");

    let result =
        FfmpegCliExtractor::default().extract_middle_frame(&dir.path().join("absent.mov"), &dest);

    assert!(result.is_err());
    assert!(!dest.exists());
}

#[test]
fn test_extracts_middle_frame() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg/ffprobe not found, skipping test_extracts_middle_frame");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("flight.mp4");
    assert!(make_test_video(&video, 10), "failed to generate test video");
    let dest = dir.path().join("frame.jpg");

    let extractor = FfmpegCliExtractor::default();
    assert_eq!(extractor.count_frames(&video).unwrap(), 10);

    let frame = extractor.extract_middle_frame(&video, &dest).unwrap();
    assert_eq!(frame.total_frames, 10);
    assert_eq!(frame.frame_index, 5);
    assert_eq!(frame.path, dest);

    let still = image::open(&dest).unwrap();
    assert_eq!((still.width(), still.height()), (64, 48));
}

#[test]
fn test_extraction_is_deterministic() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg/ffprobe not found, skipping test_extraction_is_deterministic");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("flight.mp4");
    assert!(make_test_video(&video, 7), "failed to generate test video");

    let extractor = FfmpegCliExtractor::default();
    let first = extractor
        .extract_middle_frame(&video, &dir.path().join("a.jpg"))
        .unwrap();
    let second = extractor
        .extract_middle_frame(&video, &dir.path().join("b.jpg"))
        .unwrap();

    assert_eq!(first.frame_index, 3);
    assert_eq!(first.frame_index, second.frame_index);
    assert_eq!(
        std::fs::read(&first.path).unwrap(),
        std::fs::read(&second.path).unwrap()
    );
}

#[test]
fn test_still_shows_the_middle_frame() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg/ffprobe not found, skipping test_still_shows_the_middle_frame");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("graded.mp4");
    assert!(make_graded_video(&video), "failed to generate graded video");
    let dest = dir.path().join("frame.jpg");

    let frame = FfmpegCliExtractor::default()
        .extract_middle_frame(&video, &dest)
        .unwrap();
    assert_eq!(frame.frame_index, 5);

    // Frame 5 is luma 125 (about 127 once expanded to full range); its
    // neighbours sit 25 levels away, frame 0 is black.
    let luma = mean_luma(&dest);
    assert!((113.0..=141.0).contains(&luma), "mean luma {luma} is not frame 5");
}
