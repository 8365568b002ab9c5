//! # Metadata Module
//!
//! Resolves the capturing device and capture date for a media file.
//!
//! ## Variants
//! - **Image** - EXIF `Make`/`Model` and `DateTimeOriginal` (then `DateTime`)
//! - **Video** - ISO base media (`.mp4`, `.mov`, `.3gp`) movie header and
//!   user-data atoms
//!
//! ## Fallback
//! When embedded metadata is missing or unusable the result is derived from
//! the file's modification time with device label [`UNKNOWN_CAMERA`]. The
//! reason is carried as a [`MetadataError`] so each failure mode can be
//! tested. [`MetadataExtractor::extract`] only fails when the modification
//! time itself cannot be turned into a calendar date.
//!
//! Device aliasing is not done here; see [`DeviceAliases`].

mod alias;
mod date;
mod image;
mod video;

pub use alias::DeviceAliases;
pub use date::{local_date, parse_capture_date};

use crate::core::scanner::MediaKind;
use crate::error::MetadataError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Device label used when no device can be identified
pub const UNKNOWN_CAMERA: &str = "UnknownCamera";

/// Device and date triple used to place a file in the output tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResult {
    /// Device label (raw, before aliasing)
    pub device: String,
    /// Four-digit year
    pub year: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

impl MetadataResult {
    pub fn new(device: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            device: device.into(),
            year: format!("{:04}", date.year()),
            date: date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Same triple with a different device label
    pub fn with_device(self, device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..self
        }
    }
}

/// What the embedded metadata yielded, before any fallback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    /// `make_model` or a fingerprint label
    pub device: Option<String>,
    /// Capture date, if a date field was present
    pub date: Option<NaiveDate>,
}

/// Where the date of an [`Extraction`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSource {
    /// Embedded capture metadata
    Embedded,
    /// File modification time
    ModifiedTime,
}

/// A resolved metadata triple plus its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub result: MetadataResult,
    pub source: DateSource,
    /// Set when the full fallback was taken
    pub fallback: Option<MetadataError>,
}

impl Extraction {
    /// True when the triple does not depend on the file's modification time
    pub fn is_content_derived(&self) -> bool {
        self.source == DateSource::Embedded
    }
}

/// Capability-specific extractor, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataExtractor {
    Image,
    Video,
}

impl MetadataExtractor {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MetadataExtractor::Image,
            MediaKind::Video => MetadataExtractor::Video,
        }
    }

    /// Select the variant for a path, `None` for unrecognized extensions
    pub fn for_path(path: &Path) -> Option<Self> {
        MediaKind::from_path(path).map(Self::for_kind)
    }

    /// Read embedded capture metadata without any fallback
    pub fn read_capture(&self, path: &Path) -> Result<Capture, MetadataError> {
        match self {
            MetadataExtractor::Image => image::read_capture(path),
            MetadataExtractor::Video => video::read_capture(path),
        }
    }

    /// Resolve the metadata triple for `path`.
    ///
    /// `modified` is the file's modification time as seen by the scan; it
    /// supplies the date whenever the embedded one is unavailable. Errors
    /// with [`MetadataError::ModifiedTimeOutOfRange`] if it is needed but
    /// falls outside the calendar.
    pub fn extract(&self, path: &Path, modified: SystemTime) -> Result<Extraction, MetadataError> {
        let out_of_range = || MetadataError::ModifiedTimeOutOfRange {
            path: path.to_path_buf(),
        };

        let extraction = match self.read_capture(path) {
            Ok(Capture {
                device,
                date: Some(date),
            }) => Extraction {
                result: MetadataResult::new(device.unwrap_or_else(|| UNKNOWN_CAMERA.to_string()), date),
                source: DateSource::Embedded,
                fallback: None,
            },
            Ok(Capture { device, date: None }) => {
                debug!(path = %path.display(), "no capture date, using modification time");
                Extraction {
                    result: MetadataResult::new(
                        device.unwrap_or_else(|| UNKNOWN_CAMERA.to_string()),
                        local_date(modified).ok_or_else(out_of_range)?,
                    ),
                    source: DateSource::ModifiedTime,
                    fallback: None,
                }
            }
            Err(reason) => {
                debug!(path = %path.display(), %reason, "metadata fallback");
                Extraction {
                    result: fallback(modified).ok_or_else(out_of_range)?,
                    source: DateSource::ModifiedTime,
                    fallback: Some(reason),
                }
            }
        };
        Ok(extraction)
    }
}

/// The modification-time derived triple, `None` if the time has no
/// calendar date
pub fn fallback(modified: SystemTime) -> Option<MetadataResult> {
    local_date(modified).map(|date| MetadataResult::new(UNKNOWN_CAMERA, date))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::{Local, TimeZone};
    use std::time::Duration;
    use tempfile::TempDir;

    fn noon_local(year: i32, month: u32, day: u32) -> SystemTime {
        Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .unwrap()
            .into()
    }

    #[test]
    fn result_formats_year_and_date() {
        let date = NaiveDate::from_ymd_opt(2021, 5, 4).unwrap();
        let result = MetadataResult::new("Acme_X1", date);
        assert_eq!(result.year, "2021");
        assert_eq!(result.date, "2021-05-04");
    }

    #[test]
    fn extractor_selected_by_extension() {
        assert_eq!(
            MetadataExtractor::for_path(Path::new("a.NEF")),
            Some(MetadataExtractor::Image)
        );
        assert_eq!(
            MetadataExtractor::for_path(Path::new("a.mts")),
            Some(MetadataExtractor::Video)
        );
        assert_eq!(MetadataExtractor::for_path(Path::new("a.doc")), None);
    }

    #[test]
    fn image_with_full_exif_is_embedded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.jpg");
        std::fs::write(
            &path,
            jpeg_with_exif(Some("Acme"), Some("X1"), Some("2021:05:04 10:11:12")),
        )
        .unwrap();

        let extraction = MetadataExtractor::Image.extract(&path, noon_local(2023, 1, 1)).unwrap();

        assert_eq!(extraction.source, DateSource::Embedded);
        assert!(extraction.is_content_derived());
        assert_eq!(
            extraction.result,
            MetadataResult::new("Acme_X1", NaiveDate::from_ymd_opt(2021, 5, 4).unwrap())
        );
    }

    #[test]
    fn image_without_metadata_falls_back_fully() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.jpg");
        std::fs::write(&path, bare_jpeg()).unwrap();

        let extraction = MetadataExtractor::Image.extract(&path, noon_local(2022, 1, 2)).unwrap();

        assert_eq!(extraction.result.device, UNKNOWN_CAMERA);
        assert_eq!(extraction.result.date, "2022-01-02");
        assert_eq!(extraction.source, DateSource::ModifiedTime);
        assert!(matches!(
            extraction.fallback,
            Some(MetadataError::NoMetadata { .. })
        ));
    }

    #[test]
    fn image_missing_date_keeps_device() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nodate.jpg");
        std::fs::write(&path, jpeg_with_exif(Some("Acme"), Some("X1"), None)).unwrap();

        let extraction = MetadataExtractor::Image.extract(&path, noon_local(2020, 7, 8)).unwrap();

        assert_eq!(extraction.result.device, "Acme_X1");
        assert_eq!(extraction.result.date, "2020-07-08");
        assert_eq!(extraction.source, DateSource::ModifiedTime);
        assert!(extraction.fallback.is_none());
    }

    #[test]
    fn image_with_garbage_date_falls_back_fully() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.jpg");
        std::fs::write(
            &path,
            jpeg_with_exif(Some("Acme"), Some("X1"), Some("not a date")),
        )
        .unwrap();

        let extraction = MetadataExtractor::Image.extract(&path, noon_local(2019, 3, 4)).unwrap();

        assert_eq!(Some(extraction.result), fallback(noon_local(2019, 3, 4)));
        assert!(matches!(
            extraction.fallback,
            Some(MetadataError::UnparseableDate { .. })
        ));
    }

    #[test]
    fn unreadable_file_falls_back_fully() {
        let extraction = MetadataExtractor::Image
            .extract(Path::new("/nonexistent/file.jpg"), noon_local(2018, 2, 3))
            .unwrap();

        assert_eq!(extraction.result.device, UNKNOWN_CAMERA);
        assert_eq!(extraction.result.date, "2018-02-03");
        assert!(matches!(
            extraction.fallback,
            Some(MetadataError::Unreadable { .. })
        ));
    }

    #[test]
    fn embedded_date_ignores_out_of_range_mtime() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.jpg");
        std::fs::write(
            &path,
            jpeg_with_exif(Some("Acme"), Some("X1"), Some("2021:05:04 10:11:12")),
        )
        .unwrap();
        let far_future = SystemTime::UNIX_EPOCH + Duration::from_secs(20_000_000_000_000);

        let extraction = MetadataExtractor::Image.extract(&path, far_future).unwrap();

        assert_eq!(extraction.result.date, "2021-05-04");
    }

    #[test]
    fn fallback_with_out_of_range_mtime_is_an_error() {
        let temp = TempDir::new().unwrap();
        let plain = temp.path().join("plain.jpg");
        std::fs::write(&plain, bare_jpeg()).unwrap();
        let no_date = temp.path().join("nodate.jpg");
        std::fs::write(&no_date, jpeg_with_exif(Some("Acme"), Some("X1"), None)).unwrap();
        let far_future = SystemTime::UNIX_EPOCH + Duration::from_secs(20_000_000_000_000);

        for path in [&plain, &no_date] {
            let error = MetadataExtractor::Image.extract(path, far_future).unwrap_err();
            assert_eq!(
                error,
                MetadataError::ModifiedTimeOutOfRange { path: path.clone() }
            );
        }
        assert_eq!(fallback(far_future), None);
    }

    #[test]
    fn video_without_container_metadata_falls_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.mp4");
        std::fs::write(&path, b"definitely not an mp4").unwrap();

        let extraction = MetadataExtractor::Video.extract(&path, noon_local(2022, 1, 2)).unwrap();

        assert_eq!(extraction.result.device, UNKNOWN_CAMERA);
        assert_eq!(extraction.result.year, "2022");
        assert_eq!(extraction.result.date, "2022-01-02");
        assert!(extraction.fallback.is_some());
    }

    #[test]
    fn video_with_make_model_is_embedded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.mov");
        let udta = mp4_box(
            b"udta",
            &[
                udta_text(b"\xA9mak", "Acme"),
                udta_text(b"\xA9mod", "Cam2"),
            ]
            .concat(),
        );
        std::fs::write(
            &path,
            mp4_file(&[mvhd(mac_time(2020, 8, 9), mac_time(2020, 8, 9)), udta]),
        )
        .unwrap();

        let extraction = MetadataExtractor::Video.extract(&path, noon_local(2024, 1, 1)).unwrap();

        assert_eq!(extraction.source, DateSource::Embedded);
        assert_eq!(extraction.result.device, "Acme_Cam2");
        assert_eq!(extraction.result.date, "2020-08-09");
    }
}
