//! Local filesystem archive backend.
//!
//! This module provides an archive backend implementation for the local
//! filesystem (or anything mounted into it). Directory scans and file access
//! go through `tokio::fs`, so a slow network mount never stalls the runtime.

use crate::backend::RecordingInfoStream;
use crate::error::ErrorKind;
use crate::models::{RecordingInfo, RecordingStream};
use crate::path::{SafeSegment, confine, validate_segment};
use crate::{ArchiveBackend, error::Result};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};

/// Local filesystem archive backend.
///
/// Stations are the directories directly under the configured root and
/// recordings are the files directly inside a station. All paths are
/// relative to the root.
///
/// # Examples
///
/// ```no_run
/// use airlog_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("grouped", "/mnt/recordings/grouped")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the archive
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the archive root directory
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or if it exists but is
    /// not a directory. A root that doesn't exist (yet) is fine: the
    /// recorder creates it, not us.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() && !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn station_path(&self, station: &SafeSegment) -> PathBuf {
        self.root.join(station)
    }

    fn recording_path(&self, station: &SafeSegment, filename: &SafeSegment) -> PathBuf {
        self.station_path(station).join(filename)
    }

    /// Re-use same data collection from file metadata for listing, stat and
    /// open.
    fn info(station: &str, filename: &str, metadata: &Metadata) -> Result<RecordingInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(RecordingInfo::new(station, filename, metadata.len(), modified))
    }

    /// The station directory resolved inside the root. `None` when it is
    /// missing or resolves outside the root; either way it lists nothing.
    async fn station_directory(&self, station: &SafeSegment) -> Result<Option<PathBuf>> {
        match confine(&self.root, &self.station_path(station)).await {
            Ok(resolved) => Ok(Some(resolved)),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_) | ErrorKind::InvalidPath(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolve a recording on disk, refusing anything that escapes the root
    /// or isn't a regular file.
    async fn resolve(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<(PathBuf, Metadata)> {
        let path = self.recording_path(station, filename);
        let resolved = confine(&self.root, &path).await?;
        let metadata = fs::metadata(&resolved).await.map_err(|e| ErrorKind::from_io(e, &path))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        Ok((resolved, metadata))
    }

    /// Turn a directory entry into a recording, if it is one. Anything that
    /// vanished between the scan and the `stat` is quietly dropped; the
    /// recorder owns this directory and may be moving files around.
    async fn process_entry(&self, station: &SafeSegment, entry: DirEntry) -> Result<Option<RecordingInfo>> {
        let path = entry.path();
        // Follows symlinks; confinement is enforced when a file is opened.
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => exn::bail!(ErrorKind::from_io(e, &path)),
        };
        if !metadata.is_file() {
            return Ok(None);
        }
        let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
            tracing::trace!(path = %path.display(), "Skipping non UTF-8 filename");
            return Ok(None);
        };
        Ok(Some(Self::info(station, &filename, &metadata)?))
    }
}

#[async_trait]
impl ArchiveBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_stations(&self) -> Result<Vec<SafeSegment>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(archive = %self.name, root = %self.root.display(), "Archive root does not exist yet");
                return Ok(Vec::new());
            },
            Err(err) => exn::bail!(ErrorKind::from_io(err, &self.root)),
        };

        let mut stations = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, &self.root))? {
            let Ok(metadata) = fs::metadata(entry.path()).await else {
                // Broken symlink, or removed since the scan started.
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(station) = name.to_str().and_then(|name| validate_segment(name).ok()) else {
                tracing::trace!(archive = %self.name, station = ?name, "Skipping unaddressable station directory");
                continue;
            };
            if self.station_directory(&station).await?.is_none() {
                continue;
            }
            stations.push(station);
        }
        stations.sort();
        Ok(stations)
    }

    fn list_files_stream<'a>(&'a self, station: &'a SafeSegment) -> RecordingInfoStream<'a> {
        let directory = self.station_path(station);
        Box::pin(stream! {
            // A station that has no directory simply has no recordings.
            let mut entries = match self.station_directory(station).await {
                Ok(Some(resolved)) => match fs::read_dir(&resolved).await {
                    Ok(entries) => Some(entries),
                    Err(err) => match ErrorKind::from_io(err, &directory) {
                        ErrorKind::NotFound(_) => None,
                        kind => {
                            yield Err(exn::Exn::from(kind));
                            None
                        }
                    },
                },
                Ok(None) => None,
                Err(err) => {
                    yield Err(err);
                    None
                }
            };
            'entries: while let Some(entries) = entries.as_mut() {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(e) => { yield Err(exn::Exn::from(ErrorKind::from_io(e, &directory))); break 'entries; },
                };
                match self.process_entry(station, entry).await {
                    Ok(Some(info)) => yield Ok(info),
                    Ok(None) => {},
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn exists(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<bool> {
        match self.resolve(station, filename).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn stat(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingInfo> {
        let (_, metadata) = self.resolve(station, filename).await?;
        Self::info(station, filename, &metadata)
    }

    async fn open(&self, station: &SafeSegment, filename: &SafeSegment) -> Result<RecordingStream> {
        let (resolved, _) = self.resolve(station, filename).await?;
        let file = fs::File::open(&resolved)
            .await
            .map_err(|e| ErrorKind::from_io(e, &self.recording_path(station, filename)))?;
        // Take the size from the open handle so it describes what we stream.
        let metadata = file.metadata().await.map_err(ErrorKind::Io)?;
        let info = Self::info(station, filename, &metadata)?;
        tracing::debug!(archive = %self.name, %station, %filename, bytes = info.size, "Opened recording");
        Ok(RecordingStream::new(info, file))
    }

    async fn station_modified(&self, station: &SafeSegment) -> Result<Option<OffsetDateTime>> {
        let directory = self.station_path(station);
        match fs::metadata(&directory).await {
            Ok(metadata) => Ok(Some(metadata.modified().map_err(ErrorKind::Io)?.into())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => exn::bail!(ErrorKind::from_io(err, &directory)),
        }
    }
}
