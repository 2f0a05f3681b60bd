use crate::error::{ErrorKind, Result};
use crate::{HourBucket, TIME_KEY_LEN};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// How much a query key is checked before it is used to look up a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Validation {
    /// Shape only: digits and separators in the right places. A key such as
    /// `2025-13-99T99-99` is accepted.
    #[default]
    Permissive,
    /// Shape, and the key must name a real calendar date and time.
    Strict,
}

/// A capture time in canonical filename form, `YYYY-MM-DDTHH-MM`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct TimeKey(String);

/// Byte offsets of the separators in a key; every other position is a digit.
const SEPARATORS: [(usize, u8); 4] = [(4, b'-'), (7, b'-'), (10, b'T'), (13, b'-')];

fn is_key_shaped(s: &str) -> bool {
    s.len() == TIME_KEY_LEN
        && s.bytes().enumerate().all(|(i, b)| match SEPARATORS.iter().find(|(pos, _)| *pos == i) {
            Some((_, sep)) => b == *sep,
            None => b.is_ascii_digit(),
        })
}

impl TimeKey {
    /// Parse a key by shape alone (see [`Validation::Permissive`]).
    ///
    /// ```
    /// use airlog_timekey::TimeKey;
    /// assert!(TimeKey::parse("2025-08-28T17-19").is_ok());
    /// assert!(TimeKey::parse("2025-13-99T99-99").is_ok());
    /// assert!(TimeKey::parse("2025-08-28T17:19").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if !is_key_shaped(s) {
            exn::bail!(ErrorKind::Malformed(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Parse a key and require it to be a real date and time.
    pub fn parse_strict(s: &str) -> Result<Self> {
        let key = Self::parse(s)?;
        if PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]-[minute]")).is_err() {
            exn::bail!(ErrorKind::NotCalendar(s.to_string()));
        }
        Ok(key)
    }

    pub fn parse_with(s: &str, validation: Validation) -> Result<Self> {
        match validation {
            Validation::Permissive => Self::parse(s),
            Validation::Strict => Self::parse_strict(s),
        }
    }

    /// Build the key for the minute containing `datetime`.
    pub fn from_datetime(datetime: PrimitiveDateTime) -> Result<Self> {
        let year = datetime.year();
        if !(0..=9999).contains(&year) {
            exn::bail!(ErrorKind::YearOutOfRange(year));
        }
        Ok(Self(format!(
            "{:04}-{:02}-{:02}T{:02}-{:02}",
            year,
            u8::from(datetime.month()),
            datetime.day(),
            datetime.hour(),
            datetime.minute(),
        )))
    }

    /// Accept either a canonical key or a human-style timestamp and
    /// normalise it to a key, truncating to the minute.
    ///
    /// Understood forms: `2025-08-28T17-19` (canonical), `2025-08-28T17:19`,
    /// `2025-08-28T17:19:42` and RFC 3339 (`2025-08-28T17:19:42+09:00`). The
    /// wall-clock time is kept as written; offsets are not converted, as
    /// recorders name files in their own local time.
    ///
    /// ```
    /// use airlog_timekey::{TimeKey, Validation};
    /// let key = TimeKey::from_timestamp("2025-08-28T17:19:42", Validation::Permissive).unwrap();
    /// assert_eq!(key.as_str(), "2025-08-28T17-19");
    /// ```
    pub fn from_timestamp(s: &str, validation: Validation) -> Result<Self> {
        let s = s.trim();
        if is_key_shaped(s) {
            return Self::parse_with(s, validation);
        }
        let parsed = PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
            .or_else(|_| PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]")))
            .or_else(|_| {
                OffsetDateTime::parse(s, &Rfc3339).map(|dt| PrimitiveDateTime::new(dt.date(), dt.time()))
            });
        match parsed {
            Ok(datetime) => Self::from_datetime(datetime),
            Err(_) => exn::bail!(ErrorKind::Timestamp(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hour_bucket(&self) -> HourBucket {
        HourBucket::of_key(self)
    }

    /// The recording filename for this key.
    pub fn filename(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}
impl FromStr for TimeKey {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl AsRef<str> for TimeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
