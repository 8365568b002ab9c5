//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{Local, TimeZone};
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

/// A minimal JPEG carrying `Make`, `Model` and `DateTimeOriginal`
pub fn jpeg_with_exif(make: &str, model: &str, date_original: &str) -> Vec<u8> {
    let fields = [
        ascii(Tag::Make, make),
        ascii(Tag::Model, model),
        ascii(Tag::DateTimeOriginal, date_original),
    ];

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// A JPEG without any EXIF segment
pub fn bare_jpeg() -> Vec<u8> {
    vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
    ]
}

/// Local noon on the given day
pub fn local_noon(year: i32, month: u32, day: u32) -> SystemTime {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
        .into()
}

pub fn set_mtime(path: &Path, modified: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}
