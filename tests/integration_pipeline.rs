//! Integration tests for the pipeline module.
//!
//! These tests verify end-to-end organize behavior including:
//! - Duplicate collapsing and canonical selection
//! - Metadata fallback for files without capture data
//! - Idempotent re-runs and cache equivalence

#![cfg(unix)]

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use photo_flow::core::cache::{CacheBackend, SqliteCache};
use photo_flow::core::metadata::DeviceAliases;
use photo_flow::core::organize::LinkMode;
use photo_flow::core::pipeline::Pipeline;
use predicates::prelude::*;
use std::fs;
use std::time::Duration;

const DAY: Duration = Duration::from_secs(86_400);

#[test]
fn pipeline_handles_empty_directory() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .build()
        .run()
        .unwrap();

    assert!(result.nothing_to_organize());
    assert_eq!(result.links_created, 0);
    assert!(result.errors.is_empty());
}

#[test]
fn pipeline_handles_nonexistent_source() {
    let output = TempDir::new().unwrap();

    let result = Pipeline::builder()
        .source("/nonexistent/path/that/does/not/exist")
        .output(output.path())
        .build()
        .run()
        .unwrap();

    assert!(result.nothing_to_organize());
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn identical_files_link_only_the_oldest() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let jpeg = common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00");
    let newer = common::local_noon(2024, 2, 10);

    let a = source.child("a.jpg");
    a.write_binary(&jpeg).unwrap();
    common::set_mtime(a.path(), newer - DAY);
    let b = source.child("b.jpg");
    b.write_binary(&jpeg).unwrap();
    common::set_mtime(b.path(), newer);

    let result = Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .build()
        .run()
        .unwrap();

    assert_eq!(result.files_scanned, 2);
    assert_eq!(result.duplicate_groups, 1);
    assert_eq!(result.duplicates, 1);
    assert_eq!(result.links_created, 1);

    let day = output.child("Acme_X1/2021/2021-05-04");
    day.child("a.jpg").assert(predicate::path::is_symlink());
    day.child("b.jpg").assert(predicate::path::missing());
    assert_eq!(fs::read_link(day.child("a.jpg").path()).unwrap(), fs::canonicalize(a.path()).unwrap());
}

#[test]
fn same_content_under_other_names_is_one_group() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let jpeg = common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00");

    source.child("DCIM/IMG_0001.JPG").write_binary(&jpeg).unwrap();
    source.child("backup/copy of IMG_0001.jpeg").write_binary(&jpeg).unwrap();
    source.child("phone/IMG_0002.JPG").write_binary(&common::bare_jpeg()).unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .build()
        .run()
        .unwrap();

    assert_eq!(result.files_scanned, 3);
    assert_eq!(result.duplicate_groups, 2);
    assert_eq!(result.links_created, 2);
}

#[test]
fn video_without_metadata_uses_modification_date() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let clip = source.child("holiday.MOV");
    clip.write_binary(b"\x00\x00\x00\x08free-but-not-a-real-movie").unwrap();
    common::set_mtime(clip.path(), common::local_noon(2022, 1, 2));

    let result = Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .build()
        .run()
        .unwrap();

    assert_eq!(result.links_created, 1);
    output
        .child("UnknownCamera/2022/2022-01-02/holiday.MOV")
        .assert(predicate::path::is_symlink());
}

#[test]
fn rerun_adds_only_new_files() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    source
        .child("a.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00"))
        .unwrap();

    let run = || {
        Pipeline::builder()
            .source(source.path())
            .output(output.path())
            .build()
            .run()
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.links_created, 1);
    assert_eq!(second.links_created, 0);
    assert_eq!(second.links_existing, 1);

    source
        .child("later/c.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X2", "2023:08:09 18:00:00"))
        .unwrap();
    let third = run();

    assert_eq!(third.links_created, 1);
    assert_eq!(third.links_existing, 1);
    output
        .child("Acme_X2/2023/2023-08-09/c.jpg")
        .assert(predicate::path::is_symlink());
}

#[test]
fn output_nested_in_source_is_stable() {
    let source = TempDir::new().unwrap();
    source
        .child("a.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00"))
        .unwrap();
    let output = source.child("organized");

    for _ in 0..2 {
        let result = Pipeline::builder()
            .source(source.path())
            .output(output.path())
            .build()
            .run()
            .unwrap();
        assert_eq!(result.files_scanned, 1);
    }

    let entries = fs::read_dir(output.child("Acme_X1/2021/2021-05-04").path())
        .unwrap()
        .count();
    assert_eq!(entries, 1);
}

#[test]
fn aliases_shorten_device_folders() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    source
        .child("shot.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00"))
        .unwrap();

    Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .aliases(DeviceAliases::new().with_alias("Acme_X1", "X1"))
        .build()
        .run()
        .unwrap();

    output
        .child("X1/2021/2021-05-04/shot.jpg")
        .assert(predicate::path::is_symlink());
    output.child("Acme_X1").assert(predicate::path::missing());
}

#[test]
fn hard_link_mode_links_file_contents() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let jpeg = common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00");
    source.child("a.jpg").write_binary(&jpeg).unwrap();

    Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .link_mode(LinkMode::Hard)
        .build()
        .run()
        .unwrap();

    let linked = output.child("Acme_X1/2021/2021-05-04/a.jpg");
    linked.assert(predicate::path::exists());
    assert_eq!(fs::read(linked.path()).unwrap(), jpeg);
}

#[test]
fn warm_cache_matches_cold_run() {
    let source = TempDir::new().unwrap();
    let cold_out = TempDir::new().unwrap();
    let warm_out = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let db_path = cache_dir.path().join("metadata.db");

    source
        .child("a.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00"))
        .unwrap();
    source
        .child("b.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X2", "2019:12:31 23:59:59"))
        .unwrap();

    let run = |out: &TempDir| {
        Pipeline::builder()
            .source(source.path())
            .output(out.path())
            .cache(Box::new(SqliteCache::open(&db_path).unwrap()))
            .build()
            .run()
            .unwrap()
    };

    let cold = run(&cold_out);
    let warm = run(&warm_out);

    assert_eq!(cold.cache_hits, 0);
    assert_eq!(warm.cache_hits, 2);
    assert_eq!(cold.links_created, warm.links_created);
    for link in ["Acme_X1/2021/2021-05-04/a.jpg", "Acme_X2/2019/2019-12-31/b.jpg"] {
        cold_out.child(link).assert(predicate::path::is_symlink());
        warm_out.child(link).assert(predicate::path::is_symlink());
    }

    let cache = SqliteCache::open(&db_path).unwrap();
    assert_eq!(cache.len().unwrap(), 2);
}

#[test]
fn cached_metadata_outlives_the_file_it_came_from() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let db_path = cache_dir.path().join("metadata.db");
    let jpeg = common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00");

    let run = || {
        Pipeline::builder()
            .source(source.path())
            .output(output.path())
            .cache(Box::new(SqliteCache::open(&db_path).unwrap()))
            .build()
            .run()
            .unwrap()
    };

    source.child("a.jpg").write_binary(&jpeg).unwrap();
    let first = run();
    assert_eq!(first.cache_hits, 0);

    fs::remove_file(source.child("a.jpg").path()).unwrap();
    source.child("b.jpg").write_binary(&jpeg).unwrap();
    let second = run();

    assert_eq!(second.files_scanned, 1);
    assert_eq!(second.cache_hits, 1);
    assert_eq!(second.links_created, 1);
    output
        .child("Acme_X1/2021/2021-05-04/b.jpg")
        .assert(predicate::path::is_symlink());
}

#[test]
fn dot_directories_are_organized() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    source
        .child(".phone/IMG_1.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00"))
        .unwrap();

    let result = Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .build()
        .run()
        .unwrap();

    assert_eq!(result.files_scanned, 1);
    assert_eq!(result.links_created, 1);
    output
        .child("Acme_X1/2021/2021-05-04/IMG_1.jpg")
        .assert(predicate::path::is_symlink());
}

#[test]
fn same_named_photos_keep_a_stable_winner() {
    let source = TempDir::new().unwrap();
    let first = common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00");
    let mut second = first.clone();
    second.push(0);
    source.child("d1/IMG.jpg").write_binary(&first).unwrap();
    source.child("d2/IMG.jpg").write_binary(&second).unwrap();
    common::set_mtime(source.child("d1/IMG.jpg").path(), common::local_noon(2021, 5, 4));
    common::set_mtime(source.child("d2/IMG.jpg").path(), common::local_noon(2021, 5, 4));

    let mut targets = Vec::new();
    for _ in 0..10 {
        let output = TempDir::new().unwrap();
        let result = Pipeline::builder()
            .source(source.path())
            .output(output.path())
            .threads(8)
            .build()
            .run()
            .unwrap();
        assert_eq!(result.collisions, 1);
        targets.push(fs::read_link(output.child("Acme_X1/2021/2021-05-04/IMG.jpg").path()).unwrap());
    }

    // Equal times fall back to path order
    assert!(targets.iter().all(|t| t.ends_with("d1/IMG.jpg")));
}
