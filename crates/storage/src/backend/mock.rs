//! In-memory archive backend for testing.

use super::RecordingInfoStream;
use crate::ArchiveBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{RecordingInfo, RecordingStream};
use crate::path::{SafeSegment, validate_segment};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

#[derive(Default)]
struct Station {
    /// Bumped on every change, standing in for the directory mtime.
    revision: i64,
    files: BTreeMap<String, (OffsetDateTime, Vec<u8>)>,
}
impl Station {
    fn modified(&self) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(self.revision)
    }
}

/// In-memory archive backend for testing.
///
/// Stations and their files are kept in a map behind a [`RwLock`], so the
/// archive can be changed mid-test (as the recorder would) through `&self`.
/// It also counts how many station listings it has served, which lets tests
/// observe caching.
///
/// # Examples
///
/// ```
/// use airlog_storage::{ArchiveBackend, backend::MockBackend, validate_segment};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("FM1/2025-01-01T00-00.wav", b"RIFF"),
/// ]);
/// let station = validate_segment("FM1")?;
/// assert!(backend.exists(&station, &validate_segment("2025-01-01T00-00.wav")?).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    stations: RwLock<BTreeMap<String, Station>>,
    listings: AtomicUsize,
}

/// Split `station/filename`, panicking on anything a test shouldn't set up.
fn split(path: &str) -> (SafeSegment, SafeSegment) {
    let parsed = path
        .split_once('/')
        .and_then(|(station, filename)| Some((validate_segment(station).ok()?, validate_segment(filename).ok()?)));
    match parsed {
        Some(parsed) => parsed,
        // The panic here is DELIBERATE. MockBackend is intended to be used
        // in tests; if test setup is wrong, the test should not pass.
        None => panic!("MockBackend: invalid recording path {path}"),
    }
}

impl MockBackend {
    /// Create a mock backend pre-populated with `station/filename` files.
    ///
    /// Panics if any path is not exactly two valid segments.
    pub fn with_files(files: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Vec<u8>>)>) -> Self {
        let now = OffsetDateTime::now_utc();
        let mut stations: BTreeMap<String, Station> = BTreeMap::new();
        for (path, data) in files {
            let (station, filename) = split(path.as_ref());
            let entry = stations.entry(station.into_string()).or_default();
            entry.files.insert(filename.into_string(), (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            stations: RwLock::new(stations),
            listings: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add an empty station directory.
    pub fn with_station(mut self, station: &str) -> Self {
        let Ok(station) = validate_segment(station) else {
            panic!("MockBackend::with_station: invalid station {station}");
        };
        self.stations.get_mut().entry(station.into_string()).or_default();
        self
    }

    /// Add (or replace) a recording, as the recorder would.
    pub async fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        let (station, filename) = split(path);
        let mut stations = self.stations.write().await;
        let entry = stations.entry(station.into_string()).or_default();
        entry.revision += 1;
        entry.files.insert(filename.into_string(), (OffsetDateTime::now_utc(), data.into()));
    }

    /// Remove a recording. Returns whether it existed.
    pub async fn remove(&self, path: &str) -> bool {
        let (station, filename) = split(path);
        let mut stations = self.stations.write().await;
        let Some(entry) = stations.get_mut(station.as_str()) else {
            return false;
        };
        entry.revision += 1;
        entry.files.remove(filename.as_str()).is_some()
    }

    /// Number of station listings served so far.
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    async fn lookup(&self, station: &SafeSegment, filename: &SafeSegment) -> Option<(RecordingInfo, Vec<u8>)> {
        let stations = self.stations.read().await;
        let (modified, data) = stations.get(station.as_str())?.files.get(filename.as_str())?;
        let info = RecordingInfo::new(station.as_str(), filename.as_str(), data.len() as u64, *modified);
        Some((info, data.clone()))
    }

    fn not_found(station: &SafeSegment, filename: &SafeSegment) -> ErrorKind {
        ErrorKind::NotFound(PathBuf::from(station.as_str()).join(filename))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl ArchiveBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_stations(&self) -> Result<Vec<SafeSegment>> {
        let stations = self.stations.read().await;
        // BTreeMap keys are already sorted, and were validated on insert.
        stations.keys().map(|station| validate_segment(station)).collect()
    }

    fn list_files_stream<'a>(&'a self, station: &'a SafeSegment) -> RecordingInfoStream<'a> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding to
            // avoid holding the lock across yield points.
            let files: Vec<RecordingInfo> = {
                let stations = self.stations.read().await;
                stations
                    .get(station.as_str())
                    .map(|entry| {
                        entry
                            .files
                            .iter()
                            .map(|(filename, (modified, data))| {
                                RecordingInfo::new(station.as_str(), filename.as_str(), data.len() as u64, *modified)
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            };
            for info in files {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<bool> {
        Ok(self.lookup(station, filename).await.is_some())
    }

    async fn stat(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingInfo> {
        match self.lookup(station, filename).await {
            Some((info, _)) => Ok(info),
            None => exn::bail!(Self::not_found(station, filename)),
        }
    }

    async fn open(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingStream> {
        match self.lookup(station, filename).await {
            Some((info, data)) => Ok(RecordingStream::new(info, Cursor::new(data))),
            None => exn::bail!(Self::not_found(station, filename)),
        }
    }

    async fn station_modified(&self, station: &SafeSegment) -> Result<Option<OffsetDateTime>> {
        Ok(self.stations.read().await.get(station.as_str()).map(Station::modified))
    }
}
