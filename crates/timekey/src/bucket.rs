use crate::error::{ErrorKind, Result};
use crate::{HOUR_BUCKET_LEN, TimeKey};
use std::fmt;
use std::str::FromStr;

/// The hour a recording belongs to: the first 13 characters of its time key,
/// `YYYY-MM-DDTHH`.
///
/// Buckets are only ever derived from filenames by truncation. Ordering is
/// plain string ordering, which matches chronological ordering for keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct HourBucket(String);

impl HourBucket {
    /// Parse a bucket given on its own, e.g. as a query parameter. Shape
    /// only, like [`TimeKey::parse`].
    ///
    /// ```
    /// use airlog_timekey::HourBucket;
    /// assert!(HourBucket::parse("2025-01-01T00").is_ok());
    /// assert!(HourBucket::parse("2025-01-01").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let shaped = s.len() == HOUR_BUCKET_LEN
            && s.bytes().enumerate().all(|(i, b)| match i {
                4 | 7 => b == b'-',
                10 => b == b'T',
                _ => b.is_ascii_digit(),
            });
        if !shaped {
            exn::bail!(ErrorKind::Malformed(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub(crate) fn of(name: &str) -> Option<Self> {
        name.get(..HOUR_BUCKET_LEN).map(|prefix| Self(prefix.to_string()))
    }

    /// Keys are 16 ASCII bytes, so slicing one never lands mid-character.
    pub(crate) fn of_key(key: &TimeKey) -> Self {
        Self(key.as_str()[..HOUR_BUCKET_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Check whether `name` falls in this hour.
    pub fn contains(&self, name: &str) -> bool {
        name.get(..HOUR_BUCKET_LEN) == Some(self.as_str())
    }
}
impl FromStr for HourBucket {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
impl fmt::Display for HourBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl AsRef<str> for HourBucket {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl From<HourBucket> for String {
    fn from(bucket: HourBucket) -> Self {
        bucket.0
    }
}
