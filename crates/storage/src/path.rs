//! Path validation and security utilities.
//!
//! Station names and filenames arrive from untrusted callers and select
//! locations on disk. Each one must be exactly one plain path component
//! before it is joined onto the archive root, and whatever the joined path
//! finally resolves to (after symlinks) must still live under the root.

use std::fmt;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// A single path component that has passed [`validate_segment`].
///
/// Backend methods only accept `SafeSegment`s, so nothing unvalidated can be
/// joined onto the archive root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SafeSegment(String);

impl SafeSegment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
impl Deref for SafeSegment {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}
impl AsRef<str> for SafeSegment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl AsRef<Path> for SafeSegment {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}
impl fmt::Display for SafeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates a single station or filename segment.
///
/// Rejected:
/// - empty segments, `.` and anything containing `..`,
/// - separators (`/` and `\`) and absolute or drive-prefixed paths,
/// - NUL and other control characters.
///
/// # Examples
///
/// ```
/// use airlog_storage::validate_segment;
/// assert!(validate_segment("92.3MHz").is_ok());
/// assert!(validate_segment("2025-01-01T00-00.wav").is_ok());
/// assert!(validate_segment("..").is_err());
/// assert!(validate_segment("/etc").is_err());
/// assert!(validate_segment("FM1/../../etc").is_err());
/// assert!(validate_segment("a\0b").is_err());
/// ```
pub fn validate_segment(raw: &str) -> Result<SafeSegment> {
    let invalid = || ErrorKind::InvalidPath(PathBuf::from(raw));
    if raw.is_empty() || raw.contains("..") {
        exn::bail!(invalid());
    }
    // Null bytes cause truncation in C-based syscalls; the rest have no
    // business in a station or recording name.
    if raw.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        exn::bail!(invalid());
    }
    // `C:` is a drive prefix on Windows even without a separator.
    if let [drive, b':', ..] = raw.as_bytes()
        && drive.is_ascii_alphabetic()
    {
        exn::bail!(invalid());
    }
    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None) if component == raw => Ok(SafeSegment(raw.to_string())),
        _ => exn::bail!(invalid()),
    }
}

/// Resolve `candidate` (following symlinks) and check it is inside `root`.
///
/// Returns the resolved path on success,
/// [`NotFound`](crate::error::ErrorKind::NotFound) if either path does not
/// exist, and [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if the
/// candidate resolves outside the root.
pub async fn confine(root: &Path, candidate: &Path) -> Result<PathBuf> {
    let root = tokio::fs::canonicalize(root).await.map_err(|e| ErrorKind::from_io(e, root))?;
    let resolved = tokio::fs::canonicalize(candidate).await.map_err(|e| ErrorKind::from_io(e, candidate))?;
    if !resolved.starts_with(&root) {
        tracing::warn!(
            path = %candidate.display(),
            resolved = %resolved.display(),
            "Refusing path that resolves outside the archive root"
        );
        exn::bail!(ErrorKind::InvalidPath(candidate.to_path_buf()));
    }
    Ok(resolved)
}
