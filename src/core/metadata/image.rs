//! EXIF extraction for still images.

use super::{parse_capture_date, Capture};
use crate::error::MetadataError;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read device and capture date from embedded EXIF.
pub(super) fn read_capture(path: &Path) -> Result<Capture, MetadataError> {
    let file = File::open(path).map_err(|e| MetadataError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut bufreader = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut bufreader)
        .map_err(|e| convert_exif_error(path, e))?;

    let make = ascii_field(&exif, Tag::Make);
    let model = ascii_field(&exif, Tag::Model);
    let device = match (make, model) {
        (Some(make), Some(model)) => Some(format!("{}_{}", make, model)),
        _ => None,
    };

    // DateTimeOriginal is when the shutter fired; DateTime is last edit
    let raw_date = ascii_field(&exif, Tag::DateTimeOriginal).or_else(|| ascii_field(&exif, Tag::DateTime));
    let date = match raw_date {
        Some(value) => Some(parse_capture_date(&value).ok_or_else(|| {
            MetadataError::UnparseableDate {
                path: path.to_path_buf(),
                value,
            }
        })?),
        None => None,
    };

    Ok(Capture { device, date })
}

fn convert_exif_error(path: &Path, error: exif::Error) -> MetadataError {
    match error {
        exif::Error::Io(e) => MetadataError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        exif::Error::NotFound(_) | exif::Error::BlankValue(_) => MetadataError::NoMetadata {
            path: path.to_path_buf(),
        },
        other => MetadataError::MalformedContainer {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Trimmed, non-empty ASCII value of a primary-IFD field
fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    if let Value::Ascii(ref vec) = field.value {
        let bytes = vec.first()?;
        let text = std::str::from_utf8(bytes).ok()?;
        let trimmed = text.trim_end_matches('\0').trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}
