use airlog_storage::{RecordingInfo, RecordingStream};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fmt;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Characters that cannot appear raw inside a URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// As [`SEGMENT`], plus the separators that are significant in a query.
const QUERY_VALUE: &AsciiSet = &SEGMENT.add(b'&').add(b'=').add(b'+');

/// Where a resolved recording can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRef {
    /// Name of the archive the recording was found in
    pub archive: String,
    pub station: String,
    pub filename: String,
}
impl RecordingRef {
    /// Relative URL the recording is served under,
    /// `/recordings/<station>/<filename>`.
    pub fn url(&self) -> String {
        format!(
            "/recordings/{}/{}",
            utf8_percent_encode(&self.station, SEGMENT),
            utf8_percent_encode(&self.filename, SEGMENT)
        )
    }

    /// Like [`url`](Self::url), but also naming the archive, for archives
    /// other than the default one.
    pub fn archive_url(&self) -> String {
        format!("{}?archive={}", self.url(), utf8_percent_encode(&self.archive, QUERY_VALUE))
    }
}
impl fmt::Display for RecordingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.station, self.filename)
    }
}

/// Outcome of an exact lookup. A miss is an ordinary answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(RecordingRef),
    NotFound { station: String, filename: String },
}
impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn found(self) -> Option<RecordingRef> {
        match self {
            Self::Found(recording) => Some(recording),
            Self::NotFound { .. } => None,
        }
    }
}

/// Content type for a recording extension. Anything unrecognised is served
/// as opaque bytes; payloads are never inspected.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "wav" | "wave" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" | "aac" => "audio/aac",
        _ => "application/octet-stream",
    }
}

/// An opened recording, with everything needed to send it to a client.
#[derive(Debug)]
pub struct Recording {
    stream: RecordingStream,
    content_type: &'static str,
}
impl Recording {
    pub(crate) fn new(stream: RecordingStream, content_type: &'static str) -> Self {
        Self { stream, content_type }
    }

    pub fn info(&self) -> &RecordingInfo {
        self.stream.info()
    }

    pub fn len(&self) -> u64 {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn into_reader(self) -> Pin<Box<dyn AsyncRead + Send + 'static>> {
        self.stream.into_reader()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reference(station: &str, filename: &str) -> RecordingRef {
        RecordingRef {
            archive: "grouped".to_string(),
            station: station.to_string(),
            filename: filename.to_string(),
        }
    }

    #[rstest]
    #[case("FM1", "2025-01-01T01-00.wav", "/recordings/FM1/2025-01-01T01-00.wav")]
    #[case("92.3MHz", "2025-08-28T17-19.wav", "/recordings/92.3MHz/2025-08-28T17-19.wav")]
    #[case("hiroshima VHF", "2025-08-28T17-19.wav", "/recordings/hiroshima%20VHF/2025-08-28T17-19.wav")]
    #[case("100%FM", "a#b?.wav", "/recordings/100%25FM/a%23b%3F.wav")]
    fn test_url(#[case] station: &str, #[case] filename: &str, #[case] expected: &str) {
        assert_eq!(reference(station, filename).url(), expected);
    }

    #[test]
    fn test_archive_url() {
        let mut recording = reference("FM1", "2025-01-01T01-00.wav");
        recording.archive = "hiroshima VHF&CH".to_string();
        assert_eq!(
            recording.archive_url(),
            "/recordings/FM1/2025-01-01T01-00.wav?archive=hiroshima%20VHF%26CH"
        );
    }

    #[rstest]
    #[case("wav", "audio/wav")]
    #[case("WAV", "audio/wav")]
    #[case("mp3", "audio/mpeg")]
    #[case("flac", "audio/flac")]
    #[case("bin", "application/octet-stream")]
    fn test_content_type(#[case] extension: &str, #[case] expected: &str) {
        assert_eq!(content_type_for(extension), expected);
    }

    #[test]
    fn test_resolution_found() {
        let found = Resolution::Found(reference("FM1", "2025-01-01T01-00.wav"));
        assert!(found.is_found());
        assert_eq!(found.found().unwrap().to_string(), "FM1/2025-01-01T01-00.wav");
        let missing = Resolution::NotFound {
            station: "FM1".to_string(),
            filename: "2025-01-01T02-00.wav".to_string(),
        };
        assert!(!missing.is_found());
        assert!(missing.found().is_none());
    }
}
