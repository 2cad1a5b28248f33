//! Integration tests for replaying frames from disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use drowsy_watch_adapters::{load_image, FsImageSource};
use drowsy_watch_core::ImageSource;
use drowsy_watch_test_support::SyntheticImageBuilder;

#[test]
fn directory_frames_replay_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let written = SyntheticImageBuilder::write_frames(dir.path(), 12, 24, 16).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let source = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    assert_eq!(source.count_hint(), Some(12));

    let paths: Vec<String> = source
        .images()
        .map(|r| r.expect("frame should load").path)
        .collect();
    let expected: Vec<String> = written
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    assert_eq!(paths, expected);
}

#[test]
fn loaded_frame_keeps_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let paths = SyntheticImageBuilder::write_frames(dir.path(), 1, 24, 16).unwrap();

    let info = load_image(&paths[0]).unwrap();
    assert_eq!((info.width, info.height), (24, 16));
    assert!(info.path.ends_with("frame_0000.png"));
}

#[test]
fn explicit_files_keep_given_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = SyntheticImageBuilder::write_frames(dir.path(), 3, 8, 8).unwrap();
    let reversed: Vec<_> = paths.iter().rev().cloned().collect();

    let source = FsImageSource::new(reversed.clone(), false);
    assert_eq!(source.files(), reversed);
}

#[test]
fn recursion_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    SyntheticImageBuilder::write_frames(dir.path(), 1, 8, 8).unwrap();
    SyntheticImageBuilder::write_frames(&nested, 2, 8, 8).unwrap();

    let flat = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    let deep = FsImageSource::new(vec![dir.path().to_path_buf()], true);
    assert_eq!(flat.count_hint(), Some(1));
    assert_eq!(deep.count_hint(), Some(3));
}

#[test]
fn corrupt_file_is_an_item_error() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("frame_0000.png");
    std::fs::write(&bad, b"not a png").unwrap();

    let source = FsImageSource::new(vec![bad], false);
    let results: Vec<_> = source.images().collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}
