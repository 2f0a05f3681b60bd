//! Archive backend trait and implementations.
//!
//! This module defines the `ArchiveBackend` trait, which provides a unified,
//! read-only interface over an archive of `<station>/<recording>` files.
//! The archive is written by an external recorder; nothing here ever creates,
//! modifies, or deletes a file.

mod cached;
mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::cached::CachedBackend;
pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::{RecordingInfo, RecordingStream};
use crate::path::SafeSegment;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use time::OffsetDateTime;

type RecordingInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<RecordingInfo>> + Send + 'a>>;

/// Unified, read-only interface to a recording archive.
///
/// # Path Handling
/// Stations and filenames are [`SafeSegment`]s, validated with
/// [`validate_segment`](crate::validate_segment) before they get here.
/// Implementations that touch a real filesystem must additionally make sure
/// the final, symlink-resolved path stays inside their root before opening
/// anything (see [`confine`](crate::confine)).
///
/// # Absence
/// A missing archive root or station directory is a normal state (the
/// recorder may simply not have created it yet) and yields empty listings.
/// Only asking for a specific recording that isn't there produces
/// [`NotFound`](crate::error::ErrorKind::NotFound).
///
/// # Examples
///
/// ```
/// use airlog_storage::{ArchiveBackend, error::Result, validate_segment};
///
/// async fn newest_recording(backend: &dyn ArchiveBackend, station: &str) -> Result<Option<String>> {
///     let station = validate_segment(station)?;
///     let files = backend.list_files(&station).await?;
///     Ok(files.into_iter().map(|info| info.filename).max())
/// }
/// ```
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    /// Name of the configured archive (name taken from the configuration
    /// object key). Used for logging only.
    fn name(&self) -> &str;

    /// List station identifiers (directory names), ascending.
    ///
    /// Directories whose names would not pass segment validation are left
    /// out, since they could never be queried.
    async fn list_stations(&self) -> Result<Vec<SafeSegment>>;

    /// List every regular file in a station directory, in no particular order.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_files_stream()`](Self::list_files_stream) into a [`Vec`]
    /// before returning.
    async fn list_files(&self, station: &SafeSegment) -> Result<Vec<RecordingInfo>> {
        self.list_files_stream(station).try_collect().await
    }

    /// Stream file metadata for a station directory.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use futures::TryStreamExt;
    /// # use airlog_storage::{ArchiveBackend, error::Result, validate_segment};
    /// # async fn example(backend: &dyn ArchiveBackend) -> Result<()> {
    /// let station = validate_segment("92.3MHz")?;
    /// let mut stream = backend.list_files_stream(&station);
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.filename, info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_files_stream<'a>(&'a self, station: &'a SafeSegment) -> RecordingInfoStream<'a>;

    /// Check if a recording exists (and is reachable) right now.
    async fn exists(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<bool>;

    /// Get recording metadata without opening it.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingInfo>;

    /// Open a recording for streaming.
    ///
    /// Existence is checked again at open time; a file listed a moment ago
    /// may have been removed since, which is reported as
    /// [`NotFound`](crate::error::ErrorKind::NotFound).
    async fn open(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingStream>;

    /// Last modification time of a station directory, `None` if it doesn't
    /// exist. Appending a recording changes it, which makes it usable for
    /// cache invalidation.
    async fn station_modified(&self, station: &SafeSegment) -> Result<Option<OffsetDateTime>>;
}
