//! Storage models.
//!
//! These types describe recordings as the backends see them: a name inside a
//! station directory plus whatever the filesystem knows about it.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use time::OffsetDateTime;
use tokio::io::{AsyncRead, ReadBuf};

type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// Recording metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingInfo {
    /// Station (directory) the recording lives in
    pub station: String,
    /// Filename within the station directory
    pub filename: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl RecordingInfo {
    pub fn new(station: impl Into<String>, filename: impl Into<String>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            station: station.into(),
            filename: filename.into(),
            size,
            modified,
        }
    }
}

/// An opened recording, ready to be streamed.
///
/// The file was opened (and its metadata read) before this was returned, so
/// the reported size matches what is about to be streamed even if the
/// recorder appends to the directory in the meantime.
pub struct RecordingStream {
    info: RecordingInfo,
    reader: BoxAsyncRead,
}
impl RecordingStream {
    pub fn new(info: RecordingInfo, reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            info,
            reader: Box::pin(reader),
        }
    }

    pub fn info(&self) -> &RecordingInfo {
        &self.info
    }

    pub fn len(&self) -> u64 {
        self.info.size
    }

    pub fn is_empty(&self) -> bool {
        self.info.size == 0
    }

    pub fn into_reader(self) -> BoxAsyncRead {
        self.reader
    }
}
impl fmt::Debug for RecordingStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingStream").field("info", &self.info).finish_non_exhaustive()
    }
}
impl AsyncRead for RecordingStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}
