//! Container metadata for videos.
//!
//! Only ISO base media files (MP4, QuickTime, 3GP) carry metadata we can
//! read; every other container takes the modification-time fallback.
//!
//! The top level of the file is walked by seeking over box bodies, so the
//! media data is never read. The `moov` box is loaded into memory and its
//! `mvhd`, `udta` and `meta` children are inspected.

use super::Capture;
use crate::error::MetadataError;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Seconds between 1904-01-01 and 1970-01-01
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Refuse to buffer absurd movie headers
const MAX_MOOV_SIZE: u64 = 64 * 1024 * 1024;

/// Extensions whose container we parse
const ISO_CONTAINERS: &[&str] = &["mp4", "mov", "3gp"];

/// Known device strings found in user data, checked before make/model
const DEVICE_FINGERPRINTS: &[(&str, &str)] = &[("DJI OsmoPocket3", "DJI_OsmoPocket3")];

const QUICKTIME_MAKE_KEY: &str = "com.apple.quicktime.make";
const QUICKTIME_MODEL_KEY: &str = "com.apple.quicktime.model";

pub(super) fn read_capture(path: &Path) -> Result<Capture, MetadataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();
    if !ISO_CONTAINERS.contains(&ext.as_str()) {
        return Err(MetadataError::UnsupportedContainer {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| MetadataError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut reader = BufReader::new(file);

    let moov = find_top_level(&mut reader, b"moov", path)?.ok_or_else(|| {
        MetadataError::NoMetadata {
            path: path.to_path_buf(),
        }
    })?;

    parse_movie(&moov, path)
}

fn malformed(path: &Path, reason: impl Into<String>) -> MetadataError {
    MetadataError::MalformedContainer {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Scan top-level boxes for `target` and return its body
fn find_top_level(
    reader: &mut BufReader<File>,
    target: &[u8; 4],
    path: &Path,
) -> Result<Option<Vec<u8>>, MetadataError> {
    loop {
        let mut header = [0u8; 8];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => {
                return Err(MetadataError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }

        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let kind = [header[4], header[5], header[6], header[7]];

        let body_len = match size {
            // Box runs to the end of the file
            0 => None,
            1 => {
                let mut large = [0u8; 8];
                reader
                    .read_exact(&mut large)
                    .map_err(|e| malformed(path, format!("truncated box header: {e}")))?;
                let size = u64::from_be_bytes(large);
                Some(
                    size.checked_sub(16)
                        .ok_or_else(|| malformed(path, "box smaller than its header"))?,
                )
            }
            n if n < 8 => return Err(malformed(path, "box smaller than its header")),
            n => Some(n - 8),
        };

        if &kind == target {
            let mut body = Vec::new();
            match body_len {
                Some(len) if len > MAX_MOOV_SIZE => {
                    return Err(malformed(path, format!("movie header of {len} bytes")))
                }
                Some(len) => {
                    body.resize(len as usize, 0);
                    reader
                        .read_exact(&mut body)
                        .map_err(|e| malformed(path, format!("truncated movie header: {e}")))?;
                }
                None => {
                    reader
                        .take(MAX_MOOV_SIZE)
                        .read_to_end(&mut body)
                        .map_err(|e| MetadataError::Unreadable {
                            path: path.to_path_buf(),
                            reason: e.to_string(),
                        })?;
                }
            }
            return Ok(Some(body));
        }

        match body_len {
            Some(len) => {
                let skip = i64::try_from(len).map_err(|_| malformed(path, "box size overflow"))?;
                reader.seek_relative(skip).map_err(|e| MetadataError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
            None => return Ok(None),
        }
    }
}

/// Iterator over the child boxes of an in-memory box body.
///
/// Stops at the first child whose size does not fit.
struct Boxes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Boxes<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for Boxes<'a> {
    type Item = ([u8; 4], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.pos..)?;
        if rest.len() < 8 {
            return None;
        }
        let size = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let kind = [rest[4], rest[5], rest[6], rest[7]];
        let (header, size) = match size {
            0 => (8, rest.len()),
            1 => {
                let large = rest.get(8..16)?;
                let size = u64::from_be_bytes(large.try_into().ok()?);
                (16, usize::try_from(size).ok()?)
            }
            n => (8, n),
        };
        if size < header || size > rest.len() {
            return None;
        }
        self.pos += size;
        Some((kind, &rest[header..size]))
    }
}

fn child<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    Boxes::new(data).find(|(k, _)| k == kind).map(|(_, body)| body)
}

fn parse_movie(moov: &[u8], path: &Path) -> Result<Capture, MetadataError> {
    let mvhd = child(moov, b"mvhd").ok_or_else(|| malformed(path, "no movie header box"))?;
    let (created, modified) =
        movie_times(mvhd).ok_or_else(|| malformed(path, "short movie header box"))?;

    let seconds = if modified != 0 { modified } else { created };
    let date = if seconds == 0 {
        None
    } else {
        Some(mac_time_to_date(seconds).ok_or_else(|| malformed(path, "movie time out of range"))?)
    };

    Ok(Capture {
        device: device_label(moov),
        date,
    })
}

/// (creation, modification) in seconds since 1904
fn movie_times(mvhd: &[u8]) -> Option<(u64, u64)> {
    let version = *mvhd.first()?;
    if version == 1 {
        let created = u64::from_be_bytes(mvhd.get(4..12)?.try_into().ok()?);
        let modified = u64::from_be_bytes(mvhd.get(12..20)?.try_into().ok()?);
        Some((created, modified))
    } else {
        let created = u32::from_be_bytes(mvhd.get(4..8)?.try_into().ok()?) as u64;
        let modified = u32::from_be_bytes(mvhd.get(8..12)?.try_into().ok()?) as u64;
        Some((created, modified))
    }
}

fn mac_time_to_date(seconds: u64) -> Option<NaiveDate> {
    let unix = i64::try_from(seconds).ok()?.checked_sub(MAC_EPOCH_OFFSET)?;
    let utc = DateTime::<Utc>::from_timestamp(unix, 0)?;
    Some(utc.with_timezone(&Local).date_naive())
}

/// Fingerprint first, then a make/model pair
fn device_label(moov: &[u8]) -> Option<String> {
    let udta = child(moov, b"udta");
    let meta = child(moov, b"meta");

    for payload in [udta, meta].into_iter().flatten() {
        if let Some(label) = fingerprint(payload) {
            return Some(label.to_string());
        }
    }

    let (make, model) = udta
        .map(user_data_make_model)
        .filter(|(make, model)| make.is_some() && model.is_some())
        .or_else(|| {
            let meta = meta.or_else(|| udta.and_then(|u| child(u, b"meta")))?;
            Some(keyed_make_model(meta))
        })?;

    match (make, model) {
        (Some(make), Some(model)) => Some(format!("{}_{}", make, model)),
        _ => None,
    }
}

fn fingerprint(payload: &[u8]) -> Option<&'static str> {
    DEVICE_FINGERPRINTS
        .iter()
        .find(|(needle, _)| {
            let needle = needle.as_bytes();
            payload.windows(needle.len()).any(|w| w == needle)
        })
        .map(|(_, label)| *label)
}

/// `©mak` / `©mod` QuickTime user-data text atoms
fn user_data_make_model(udta: &[u8]) -> (Option<String>, Option<String>) {
    let mut make = None;
    let mut model = None;
    for (kind, body) in Boxes::new(udta) {
        match &kind {
            b"\xA9mak" => make = user_data_text(body),
            b"\xA9mod" => model = user_data_text(body),
            _ => {}
        }
    }
    (make, model)
}

fn user_data_text(body: &[u8]) -> Option<String> {
    let len = u16::from_be_bytes(body.get(0..2)?.try_into().ok()?) as usize;
    let text = body.get(4..4 + len)?;
    clean_text(text)
}

/// `meta` box with `keys` + `ilst` (QuickTime metadata)
fn keyed_make_model(meta: &[u8]) -> (Option<String>, Option<String>) {
    // ISO meta is a full box (4 bytes of version/flags); QuickTime meta is not
    let meta = match meta.get(4..8) {
        Some(b"hdlr") | Some(b"keys") | Some(b"ilst") => meta,
        _ => meta.get(4..).unwrap_or_default(),
    };

    let keys = child(meta, b"keys").map(parse_keys).unwrap_or_default();
    let mut make = None;
    let mut model = None;

    if let Some(ilst) = child(meta, b"ilst") {
        for (kind, item) in Boxes::new(ilst) {
            let index = u32::from_be_bytes(kind) as usize;
            let Some(key) = index.checked_sub(1).and_then(|i| keys.get(i)) else {
                continue;
            };
            let Some(value) = child(item, b"data").and_then(|d| d.get(8..)).and_then(clean_text)
            else {
                continue;
            };
            match key.as_str() {
                QUICKTIME_MAKE_KEY => make = Some(value),
                QUICKTIME_MODEL_KEY => model = Some(value),
                _ => {}
            }
        }
    }

    (make, model)
}

fn parse_keys(keys: &[u8]) -> Vec<String> {
    // version/flags, entry count, then the entries as boxes
    keys.get(8..)
        .map(|entries| {
            Boxes::new(entries)
                .map(|(_, name)| String::from_utf8_lossy(name).into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn clean_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_end_matches('\0').trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
