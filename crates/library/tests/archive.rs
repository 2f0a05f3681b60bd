use airlog_library::error::ErrorKind;
use airlog_library::{Library, Resolution};
use airlog_storage::backend::{CachedBackend, LocalBackend};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

fn record(root: &Path, station: &str, filename: &str, data: &[u8]) {
    let dir = root.join(station);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(filename), data).unwrap();
}

fn archive() -> (TempDir, Library) {
    let dir = TempDir::new().unwrap();
    record(dir.path(), "FM1", "2025-01-01T00-00.wav", b"RIFF0000");
    record(dir.path(), "FM1", "2025-01-01T00-30.wav", b"RIFF0030");
    record(dir.path(), "FM1", "2025-01-01T01-00.wav", b"RIFF0100");
    record(dir.path(), "FM1", "README.txt", b"not a recording");
    std::fs::create_dir_all(dir.path().join("FM2")).unwrap();
    std::fs::write(dir.path().join("stray.wav"), b"not a station").unwrap();
    let backend = LocalBackend::new("grouped", dir.path()).unwrap();
    (dir, Library::new(Arc::new(backend)))
}

#[tokio::test]
async fn test_browse_and_resolve() {
    let (_dir, library) = archive();

    assert_eq!(library.stations().await.unwrap(), ["FM1", "FM2"]);

    let hours = library.available_hours("FM1").await.unwrap();
    let hours: Vec<_> = hours.iter().map(|hour| hour.as_str()).collect();
    assert_eq!(hours, ["2025-01-01T01", "2025-01-01T00"]);

    assert_eq!(
        library.files_for_hour("FM1", "2025-01-01T00").await.unwrap(),
        ["2025-01-01T00-00.wav", "2025-01-01T00-30.wav"]
    );
    assert_eq!(
        library.all_files("FM1").await.unwrap(),
        ["2025-01-01T01-00.wav", "2025-01-01T00-30.wav", "2025-01-01T00-00.wav"]
    );
    assert!(library.all_files("FM2").await.unwrap().is_empty());

    let found = library.resolve_exact("FM1", "2025-01-01T01-00").await.unwrap();
    assert_eq!(found.found().unwrap().url(), "/recordings/FM1/2025-01-01T01-00.wav");
    let missing = library.resolve_exact("FM1", "2025-01-01T02-00").await.unwrap();
    assert!(matches!(missing, Resolution::NotFound { .. }));

    let recording = library.open("FM1", "2025-01-01T00-30.wav").await.unwrap();
    assert_eq!(recording.len(), 8);
    assert_eq!(recording.content_type(), "audio/wav");
    let mut body = Vec::new();
    recording.into_reader().read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"RIFF0030");
}

#[tokio::test]
async fn test_new_recordings_show_up() {
    let (dir, library) = archive();
    assert!(!library.resolve_exact("FM1", "2025-01-01T02-00").await.unwrap().is_found());
    record(dir.path(), "FM1", "2025-01-01T02-00.wav", b"RIFF0200");
    assert!(library.resolve_exact("FM1", "2025-01-01T02-00").await.unwrap().is_found());
    assert_eq!(library.available_hours("FM1").await.unwrap()[0].as_str(), "2025-01-01T02");
}

#[tokio::test]
async fn test_cached_listing_follows_directory_changes() {
    let (dir, _) = archive();
    let local = LocalBackend::new("grouped", dir.path()).unwrap();
    let cached = CachedBackend::new(Arc::new(local), Duration::from_secs(3600));
    let library = Library::new(Arc::new(cached));

    assert_eq!(library.all_files("FM1").await.unwrap().len(), 3);
    std::fs::remove_file(dir.path().join("FM1/2025-01-01T00-00.wav")).unwrap();
    // Opening never trusts the listing.
    let err = library.open("FM1", "2025-01-01T00-00.wav").await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::NotFound { .. }));
}

#[tokio::test]
async fn test_missing_root_is_an_empty_archive() {
    let dir = TempDir::new().unwrap();
    let backend = LocalBackend::new("grouped", dir.path().join("not-yet")).unwrap();
    let library = Library::new(Arc::new(backend));
    assert!(library.stations().await.unwrap().is_empty());
    assert!(library.available_hours("FM1").await.unwrap().is_empty());
    assert!(library.files_for_hour("FM1", "2025-01-01T00").await.unwrap().is_empty());
    assert!(!library.resolve_exact("FM1", "2025-01-01T00-00").await.unwrap().is_found());
}

#[tokio::test]
async fn test_file_named_as_station_is_an_empty_station() {
    let (_dir, library) = archive();
    assert!(library.available_hours("stray.wav").await.unwrap().is_empty());
    assert!(library.all_files("stray.wav").await.unwrap().is_empty());
    let resolution = library.resolve_exact("stray.wav", "2025-01-01T00-00").await.unwrap();
    assert!(matches!(resolution, Resolution::NotFound { .. }));
    let err = library.open("stray.wav", "2025-01-01T00-00.wav").await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::NotFound { .. }));
}

#[tokio::test]
async fn test_traversal_never_reaches_the_filesystem() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("archive");
    record(&root, "FM1", "2025-01-01T00-00.wav", b"RIFF");
    record(outer.path(), "secret", "2025-01-01T00-00.wav", b"secret");
    let library = Library::new(Arc::new(LocalBackend::new("grouped", &root).unwrap()));

    for station in ["..", "../secret", "FM1/../../secret", "/etc"] {
        let err = library.all_files(station).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)), "{station}");
        let err = library.open(station, "2025-01-01T00-00.wav").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)), "{station}");
    }
    let err = library.open("FM1", "../../secret/2025-01-01T00-00.wav").await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_station_outside_root_is_never_read() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("archive");
    std::fs::create_dir_all(&root).unwrap();
    record(outer.path(), "secret", "2025-01-01T00-00.wav", b"secret");
    std::os::unix::fs::symlink(outer.path().join("secret"), root.join("FM1")).unwrap();
    let library = Library::new(Arc::new(LocalBackend::new("grouped", &root).unwrap()));

    assert!(library.stations().await.unwrap().is_empty());
    assert!(library.all_files("FM1").await.unwrap().is_empty());
    assert!(library.available_hours("FM1").await.unwrap().is_empty());
    let err = library.open("FM1", "2025-01-01T00-00.wav").await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
}
