//! Integration tests for reviewing an organized tree.

#![cfg(unix)]

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use photo_flow::core::pipeline::Pipeline;
use photo_flow::core::review;
use predicates::prelude::*;

#[test]
fn organized_images_can_be_marked_as_selects() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let selects = TempDir::new().unwrap();

    source
        .child("b.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X1", "2021:05:04 09:30:00"))
        .unwrap();
    source
        .child("a.jpg")
        .write_binary(&common::jpeg_with_exif("Acme", "X1", "2021:05:04 10:00:00"))
        .unwrap();
    source.child("clip.mp4").write_binary(b"not a movie").unwrap();

    Pipeline::builder()
        .source(source.path())
        .output(output.path())
        .build()
        .run()
        .unwrap();

    let listed = review::list_organized(output.path()).unwrap();
    assert_eq!(
        listed,
        vec![
            output.child("Acme_X1/2021/2021-05-04/a.jpg").path().to_path_buf(),
            output.child("Acme_X1/2021/2021-05-04/b.jpg").path().to_path_buf(),
        ]
    );

    let outcome = review::mark_select(&listed[1], selects.path()).unwrap();
    assert!(outcome.is_created());
    selects.child("b.jpg").assert(predicate::path::is_symlink());
    assert!(!review::mark_select(&listed[1], selects.path()).unwrap().is_created());
}
