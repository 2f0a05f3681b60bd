//! Time keys and the filenames they are embedded in.
//!
//! Every recording in the archive is named after the minute its capture
//! started, `YYYY-MM-DDTHH-MM.<ext>`. The fields are zero-padded and fixed
//! width, so plain string ordering of keys is chronological ordering, and the
//! hour a recording belongs to is nothing more than the first 13 characters
//! of its name.
//!
//! The filename helpers here are deliberately permissive: they look at string
//! shape only, never at calendar semantics. A stray `2025-13-99T99-99.wav`
//! is a perfectly good recording as far as listings are concerned. Stricter
//! checking of *query* keys is available through [`Validation::Strict`].

mod bucket;
pub mod error;
mod key;

pub use crate::bucket::HourBucket;
pub use crate::key::{TimeKey, Validation};

/// Length of a canonical time key, e.g. `2025-01-01T00-00`.
pub const TIME_KEY_LEN: usize = 16;
/// Length of an hour bucket, e.g. `2025-01-01T00`.
pub const HOUR_BUCKET_LEN: usize = 13;
/// Extension recordings are written with unless configured otherwise.
pub const DEFAULT_EXTENSION: &str = "wav";

/// Returns the part of `name` before `.extension`, if it has that extension.
fn strip_extension<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    name.strip_suffix(extension)?.strip_suffix('.')
}

/// Check whether `name` carries the recording extension (case-sensitive).
pub fn has_extension(name: &str, extension: &str) -> bool {
    strip_extension(name, extension).is_some()
}

/// Check whether `name` looks like a recording: it carries the extension and
/// is at least as long as a time key plus that extension.
///
/// Names failing this check are skipped by listings, never reported.
///
/// ```
/// use airlog_timekey::is_well_formed_filename;
/// assert!(is_well_formed_filename("2025-01-01T00-00.wav", "wav"));
/// assert!(!is_well_formed_filename("notes.wav", "wav"));
/// assert!(!is_well_formed_filename("2025-01-01T00-00.mp3", "wav"));
/// ```
pub fn is_well_formed_filename(name: &str, extension: &str) -> bool {
    name.len() > TIME_KEY_LEN + extension.len() && has_extension(name, extension)
}

/// Derive the hour bucket of a well-formed recording filename by truncation.
///
/// Returns `None` only when the name is too short, or when the 13th byte
/// falls inside a multi-byte character (which no well-formed key can do).
pub fn hour_bucket_of(name: &str) -> Option<HourBucket> {
    HourBucket::of(name)
}

/// Check whether `name` is exactly the recording file for `key`.
pub fn matches_exact(name: &str, key: &TimeKey, extension: &str) -> bool {
    strip_extension(name, extension) == Some(key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2025-01-01T00-00.wav", true)]
    #[case("2025-13-99T99-99.wav", true)]
    #[case("2025-01-01T00-00-extra.wav", true)]
    #[case("2025-01-01T00.wav", false)]
    #[case("2025-01-01T00-00.WAV", false)]
    #[case("2025-01-01T00-00wav", false)]
    #[case("2025-01-01T00-00.wav.part", false)]
    #[case(".wav", false)]
    #[case("", false)]
    fn test_well_formed(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_well_formed_filename(name, DEFAULT_EXTENSION), expected);
    }

    #[test]
    fn test_well_formed_other_extension() {
        assert!(is_well_formed_filename("2025-01-01T00-00.flac", "flac"));
        assert!(!is_well_formed_filename("2025-01-01T00-00.wav", "flac"));
    }

    #[rstest]
    #[case("2025-01-01T00-00.wav", "2025-01-01T00")]
    #[case("2025-01-01T23-59.wav", "2025-01-01T23")]
    #[case("2025-13-99T99-99.wav", "2025-13-99T99")]
    fn test_hour_bucket_is_prefix(#[case] name: &str, #[case] expected: &str) {
        let first = hour_bucket_of(name).unwrap();
        assert_eq!(first.as_str(), expected);
        assert_eq!(first.as_str(), &name[..HOUR_BUCKET_LEN]);
        // Pure: deriving twice gives the same bucket.
        assert_eq!(hour_bucket_of(name).unwrap(), first);
    }

    #[test]
    fn test_hour_bucket_of_short_or_split_name() {
        assert!(hour_bucket_of("2025-01-01").is_none());
        // 12 ASCII bytes followed by a multi-byte character.
        assert!(hour_bucket_of("2025-01-01T0é-00.wav").is_none());
    }

    #[test]
    fn test_matches_exact() {
        let key = TimeKey::parse("2025-01-01T01-00").unwrap();
        assert!(matches_exact("2025-01-01T01-00.wav", &key, "wav"));
        assert!(!matches_exact("2025-01-01T01-00.wav.bak", &key, "wav"));
        assert!(!matches_exact("2025-01-01T01-001.wav", &key, "wav"));
        assert!(!matches_exact("2025-01-01T01-00.flac", &key, "wav"));
    }
}
