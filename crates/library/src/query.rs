//! Queries over one archive.
//!
//! The directory listing *is* the database. Every query scans the station
//! directory (possibly through a caching backend) and derives its answer from
//! filenames alone, so there is nothing to keep in sync with the recorder.

use crate::error::{ErrorKind, Result};
use crate::recording::{Recording, RecordingRef, Resolution, content_type_for};
use airlog_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use airlog_storage::{BackendHandle, SafeSegment, validate_segment};
use airlog_timekey::{DEFAULT_EXTENSION, HourBucket, TimeKey, Validation};
use exn::ResultExt;
use std::collections::BTreeSet;

/// Answers station, hour and exact-time questions about one archive.
///
/// All inputs are raw, untrusted strings; every station and filename goes
/// through [`validate_segment`] before the backend sees it.
///
/// # Examples
///
/// ```no_run
/// use airlog_library::Library;
/// use airlog_storage::backend::LocalBackend;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("grouped", "/mnt/recordings/grouped")?;
/// let library = Library::new(Arc::new(backend));
/// for hour in library.available_hours("92.3MHz").await? {
///     println!("{hour}: {:?}", library.files_for_hour("92.3MHz", hour.as_str()).await?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Library {
    backend: BackendHandle,
    extension: String,
    validation: Validation,
}

impl Library {
    /// A library over `backend`, expecting `.wav` recordings and checking
    /// query keys by shape only.
    pub fn new(backend: BackendHandle) -> Self {
        Self {
            backend,
            extension: DEFAULT_EXTENSION.to_string(),
            validation: Validation::default(),
        }
    }

    /// Change the recording extension (without the leading dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Change how strictly query keys are checked.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Name of the underlying archive.
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn validation(&self) -> Validation {
        self.validation
    }

    /// Station identifiers, ascending. Empty if the archive root is missing.
    pub async fn stations(&self) -> Result<Vec<String>> {
        let stations = self.backend.list_stations().await.or_raise(|| ErrorKind::Storage)?;
        Ok(stations.into_iter().map(SafeSegment::into_string).collect())
    }

    /// Hours that have at least one recording, newest first, no duplicates.
    pub async fn available_hours(&self, station: &str) -> Result<Vec<HourBucket>> {
        let station = segment(station)?;
        let hours: BTreeSet<HourBucket> = self
            .recordings(&station)
            .await?
            .iter()
            .filter(|name| self.is_well_formed(name))
            .filter_map(|name| airlog_timekey::hour_bucket_of(name))
            .collect();
        Ok(hours.into_iter().rev().collect())
    }

    /// Recordings within `hour` (`YYYY-MM-DDTHH`), oldest first.
    pub async fn files_for_hour(&self, station: &str, hour: &str) -> Result<Vec<String>> {
        let station = segment(station)?;
        let mut files: Vec<String> = self
            .recordings(&station)
            .await?
            .into_iter()
            .filter(|name| name.get(..airlog_timekey::HOUR_BUCKET_LEN) == Some(hour))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Every recording of a station, newest first.
    pub async fn all_files(&self, station: &str) -> Result<Vec<String>> {
        let station = segment(station)?;
        let mut files = self.recordings(&station).await?;
        files.sort_by(|a, b| b.cmp(a));
        Ok(files)
    }

    /// Look up the recording for exactly `time_key` (`YYYY-MM-DDTHH-MM`).
    ///
    /// Answers from the archive as it is right now; a miss is
    /// [`Resolution::NotFound`], not an error.
    pub async fn resolve_exact(&self, station: &str, time_key: &str) -> Result<Resolution> {
        let key = TimeKey::parse_with(time_key, self.validation)
            .or_raise(|| ErrorKind::InvalidTimeKey(time_key.to_string()))?;
        self.resolve_key(station, &key).await
    }

    /// Like [`resolve_exact`](Self::resolve_exact), but also accepts ordinary
    /// timestamps such as `2025-08-28T17:19` or RFC 3339.
    pub async fn search(&self, station: &str, timestamp: &str) -> Result<Resolution> {
        let key = TimeKey::from_timestamp(timestamp, self.validation)
            .or_raise(|| ErrorKind::InvalidTimeKey(timestamp.to_string()))?;
        self.resolve_key(station, &key).await
    }

    /// Open a recording for streaming.
    ///
    /// Only files carrying the recording extension are served. A file that
    /// was listed but has since disappeared is
    /// [`NotFound`](ErrorKind::NotFound).
    pub async fn open(&self, station: &str, filename: &str) -> Result<Recording> {
        let station = segment(station)?;
        let filename = segment(filename)?;
        if !airlog_timekey::has_extension(&filename, &self.extension) {
            exn::bail!(ErrorKind::NotFound {
                station: station.into_string(),
                filename: filename.into_string(),
            });
        }
        let stream = self
            .backend
            .open(&station, &filename)
            .await
            .map_err(|err| storage_error(err, &station, &filename))?;
        Ok(Recording::new(stream, content_type_for(&self.extension)))
    }

    async fn resolve_key(&self, station: &str, key: &TimeKey) -> Result<Resolution> {
        let station = segment(station)?;
        let filename = segment(&key.filename(&self.extension))?;
        let exists = self
            .backend
            .exists(&station, &filename)
            .await
            .map_err(|err| storage_error(err, &station, &filename))?;
        tracing::debug!(archive = %self.name(), %station, %filename, exists, "Resolved exact time key");
        Ok(match exists {
            true => Resolution::Found(RecordingRef {
                archive: self.name().to_string(),
                station: station.into_string(),
                filename: filename.into_string(),
            }),
            false => Resolution::NotFound {
                station: station.into_string(),
                filename: filename.into_string(),
            },
        })
    }

    /// Filenames in a station carrying the recording extension, unordered.
    async fn recordings(&self, station: &SafeSegment) -> Result<Vec<String>> {
        let files = self.backend.list_files(station).await.or_raise(|| ErrorKind::Storage)?;
        Ok(files
            .into_iter()
            .map(|info| info.filename)
            .filter(|name| airlog_timekey::has_extension(name, &self.extension))
            .collect())
    }

    fn is_well_formed(&self, name: &str) -> bool {
        let well_formed = airlog_timekey::is_well_formed_filename(name, &self.extension);
        if !well_formed {
            tracing::trace!(archive = %self.name(), filename = name, "Skipping malformed recording name");
        }
        well_formed
    }
}

fn segment(raw: &str) -> Result<SafeSegment> {
    validate_segment(raw).or_raise(|| ErrorKind::InvalidPath(raw.to_string()))
}

/// Translate a backend failure about one recording into the caller's terms.
fn storage_error(err: StorageError, station: &SafeSegment, filename: &SafeSegment) -> crate::error::Error {
    let kind = match &*err {
        StorageErrorKind::NotFound(_) => ErrorKind::NotFound {
            station: station.to_string(),
            filename: filename.to_string(),
        },
        StorageErrorKind::InvalidPath(_) => ErrorKind::InvalidPath(format!("{station}/{filename}")),
        _ => ErrorKind::Storage,
    };
    err.raise(kind)
}
