//! Listing cache decorator.
//!
//! Wraps another backend and remembers station listings in memory, so a busy
//! archive browser doesn't rescan the same directory on every request. The
//! filenames are still the only source of truth: an entry is thrown away as
//! soon as it gets too old or the station directory's modification time
//! changes (which it does whenever the recorder adds or removes a file).

use crate::backend::RecordingInfoStream;
use crate::models::{RecordingInfo, RecordingStream};
use crate::path::SafeSegment;
use crate::{ArchiveBackend, BackendHandle, error::Result};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::RwLock;

struct Entry {
    fetched: Instant,
    modified: Option<OffsetDateTime>,
    files: Vec<RecordingInfo>,
}
impl Entry {
    fn is_fresh(&self, ttl: Duration, modified: Option<OffsetDateTime>) -> bool {
        self.modified == modified && self.fetched.elapsed() < ttl
    }
}

/// Caching archive backend.
///
/// Only [`list_files`](ArchiveBackend::list_files) (and its streaming form)
/// is cached, keyed by station. Everything else, in particular existence
/// checks and opening files, always goes to the inner backend.
pub struct CachedBackend {
    inner: BackendHandle,
    ttl: Duration,
    entries: RwLock<HashMap<SafeSegment, Entry>>,
}
impl CachedBackend {
    pub fn new(inner: BackendHandle, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Forget every cached listing.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl ArchiveBackend for CachedBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_stations(&self) -> Result<Vec<SafeSegment>> {
        self.inner.list_stations().await
    }

    async fn list_files(&self, station: &SafeSegment) -> Result<Vec<RecordingInfo>> {
        let modified = self.inner.station_modified(station).await?;
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(station)
                && entry.is_fresh(self.ttl, modified)
            {
                tracing::trace!(archive = %self.name(), %station, "Serving station listing from cache");
                return Ok(entry.files.clone());
            }
        }

        // Scan without holding the lock; concurrent misses may scan twice,
        // the last one in wins.
        let files = self.inner.list_files(station).await?;
        if modified.is_none() {
            // Nothing to remember for a station that doesn't exist yet.
            self.entries.write().await.remove(station);
            return Ok(files);
        }
        tracing::debug!(archive = %self.name(), %station, files = files.len(), "Refreshed cached station listing");
        let entry = Entry {
            fetched: Instant::now(),
            modified,
            files: files.clone(),
        };
        self.entries.write().await.insert(station.clone(), entry);
        Ok(files)
    }

    fn list_files_stream<'a>(&'a self, station: &'a SafeSegment) -> RecordingInfoStream<'a> {
        Box::pin(stream! {
            match self.list_files(station).await {
                Ok(files) => for info in files {
                    yield Ok(info);
                },
                Err(e) => yield Err(e),
            }
        })
    }

    async fn exists(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<bool> {
        self.inner.exists(station, filename).await
    }

    async fn stat(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingInfo> {
        self.inner.stat(station, filename).await
    }

    async fn open(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingStream> {
        self.inner.open(station, filename).await
    }

    async fn station_modified(&self, station: &SafeSegment) -> Result<Option<OffsetDateTime>> {
        self.inner.station_modified(station).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::validate_segment;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    fn setup(ttl: Duration) -> (Arc<MockBackend>, CachedBackend) {
        let mock = Arc::new(MockBackend::with_files([
            ("FM1/2025-01-01T00-00.wav", b"a"),
            ("FM1/2025-01-01T00-30.wav", b"b"),
        ]));
        let cached = CachedBackend::new(mock.clone(), ttl);
        (mock, cached)
    }

    #[tokio::test]
    async fn test_repeated_listing_is_cached() {
        let (mock, cached) = setup(HOUR);
        let station = validate_segment("FM1").unwrap();
        assert_eq!(cached.list_files(&station).await.unwrap().len(), 2);
        assert_eq!(cached.list_files(&station).await.unwrap().len(), 2);
        assert_eq!(mock.listings(), 1);
    }

    #[tokio::test]
    async fn test_directory_change_invalidates() {
        let (mock, cached) = setup(HOUR);
        let station = validate_segment("FM1").unwrap();
        assert_eq!(cached.list_files(&station).await.unwrap().len(), 2);
        mock.insert("FM1/2025-01-01T01-00.wav", b"c".to_vec()).await;
        assert_eq!(cached.list_files(&station).await.unwrap().len(), 3);
        assert_eq!(mock.listings(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refreshed() {
        let (mock, cached) = setup(Duration::ZERO);
        let station = validate_segment("FM1").unwrap();
        cached.list_files(&station).await.unwrap();
        cached.list_files(&station).await.unwrap();
        assert_eq!(mock.listings(), 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let (mock, cached) = setup(HOUR);
        let station = validate_segment("FM1").unwrap();
        cached.list_files(&station).await.unwrap();
        cached.clear().await;
        cached.list_files(&station).await.unwrap();
        assert_eq!(mock.listings(), 2);
    }

    #[tokio::test]
    async fn test_missing_station_is_not_cached() {
        let (mock, cached) = setup(HOUR);
        let station = validate_segment("FM9").unwrap();
        assert!(cached.list_files(&station).await.unwrap().is_empty());
        mock.insert("FM9/2025-01-01T00-00.wav", b"new".to_vec()).await;
        assert_eq!(cached.list_files(&station).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_passes_through() {
        let (mock, cached) = setup(HOUR);
        let station = validate_segment("FM1").unwrap();
        let filename = validate_segment("2025-01-01T00-30.wav").unwrap();
        cached.list_files(&station).await.unwrap();
        assert!(mock.remove("FM1/2025-01-01T00-30.wav").await);
        // Existence is never answered from the cache.
        assert!(!cached.exists(&station, &filename).await.unwrap());
        assert!(cached.open(&station, &filename).await.is_err());
    }
}
