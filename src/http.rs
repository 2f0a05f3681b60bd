//! # HTTP API
//!
//! | Path | Description |
//! |------|-------------|
//! | `/api/archives` | Archives whose root currently exists |
//! | `/api/stations` | Stations of an archive (`/api/frequencies` is the older name) |
//! | `/api/available_hours/{station}` | Hours with recordings, newest first |
//! | `/api/files_for_hour/{station}/{hour}` | Recordings in an hour, oldest first |
//! | `/api/files/{station}` | Every recording of a station, newest first |
//! | `/api/search?frequency=&date=` | Resolve an exact time to a recording URL |
//! | `/recordings/{station}/{filename}` | The recording itself (also `/audio/...`) |
//!
//! Every route accepts `?archive=NAME` to query an archive other than the
//! default one. Failures are JSON, `{"success": false, "error": "..."}`.

use crate::archives::Archives;
use crate::error::{Error as AppError, ErrorKind as AppErrorKind, Result};
use airlog_library::error::{Error as LibraryError, ErrorKind as LibraryErrorKind};
use airlog_library::{Library, Resolution};
use airlog_timekey::HourBucket;
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;

type SharedArchives = Arc<Archives>;

#[derive(Debug, Default, Deserialize)]
struct ArchiveParam {
    archive: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    frequency: Option<String>,
    date: Option<String>,
    archive: Option<String>,
}

#[derive(Debug, Serialize)]
struct ArchivesResponse {
    default: String,
    archives: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    success: bool,
    url: String,
}

/// A failed request, as the client sees it.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string()),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        let kind: &LibraryErrorKind = &err;
        match kind {
            LibraryErrorKind::InvalidPath(_) | LibraryErrorKind::InvalidTimeKey(_) => {
                tracing::debug!(error = %kind, "Rejected request");
                Self::BadRequest(kind.to_string())
            },
            LibraryErrorKind::NotFound { .. } => Self::NotFound("File not found.".to_string()),
            LibraryErrorKind::Storage => {
                tracing::error!(error = ?err, "Archive query failed");
                Self::Internal
            },
        }
    }
}
impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match &*err {
            kind @ AppErrorKind::UnknownArchive(_) => Self::NotFound(kind.to_string()),
            _ => {
                tracing::error!(error = ?err, "Request failed");
                Self::Internal
            },
        }
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn router(archives: SharedArchives) -> Router {
    Router::new()
        .route("/api/archives", get(list_archives))
        .route("/api/stations", get(list_stations))
        .route("/api/frequencies", get(list_frequencies))
        .route("/api/available_hours/{station}", get(available_hours))
        .route("/api/files_for_hour/{station}/{hour}", get(files_for_hour))
        .route("/api/files/{station}", get(all_files))
        .route("/api/search", get(search))
        .route("/recordings/{station}/{filename}", get(stream_recording))
        .route("/audio/{station}/{filename}", get(stream_recording))
        .layer(middleware::from_fn(log_request))
        .with_state(archives)
}

/// Serve the API until interrupted.
pub async fn serve(archives: SharedArchives, listen: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen).await.or_raise(|| AppErrorKind::Server)?;
    tracing::info!(%listen, default_archive = archives.default_name(), "Serving recordings");
    axum::serve(listener, router(archives))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .or_raise(|| AppErrorKind::Server)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}

fn library<'a>(archives: &'a Archives, name: Option<&str>) -> ApiResult<&'a Library> {
    Ok(archives.get(name)?)
}

async fn list_archives(State(archives): State<SharedArchives>) -> Json<ArchivesResponse> {
    let response = ArchivesResponse {
        default: archives.default_name().to_string(),
        archives: archives.available().await.into_iter().map(str::to_string).collect(),
    };
    Json(response)
}

async fn list_stations(
    State(archives): State<SharedArchives>,
    Query(params): Query<ArchiveParam>,
) -> ApiResult<Json<serde_json::Value>> {
    let stations = library(&archives, params.archive.as_deref())?.stations().await?;
    Ok(Json(json!({ "stations": stations })))
}

async fn list_frequencies(
    State(archives): State<SharedArchives>,
    Query(params): Query<ArchiveParam>,
) -> ApiResult<Json<serde_json::Value>> {
    let stations = library(&archives, params.archive.as_deref())?.stations().await?;
    Ok(Json(json!({ "frequencies": stations })))
}

async fn available_hours(
    State(archives): State<SharedArchives>,
    Path(station): Path<String>,
    Query(params): Query<ArchiveParam>,
) -> ApiResult<Json<Vec<HourBucket>>> {
    let library = library(&archives, params.archive.as_deref())?;
    Ok(Json(library.available_hours(&station).await?))
}

async fn files_for_hour(
    State(archives): State<SharedArchives>,
    Path((station, hour)): Path<(String, String)>,
    Query(params): Query<ArchiveParam>,
) -> ApiResult<Json<Vec<String>>> {
    let library = library(&archives, params.archive.as_deref())?;
    Ok(Json(library.files_for_hour(&station, &hour).await?))
}

async fn all_files(
    State(archives): State<SharedArchives>,
    Path(station): Path<String>,
    Query(params): Query<ArchiveParam>,
) -> ApiResult<Json<Vec<String>>> {
    let library = library(&archives, params.archive.as_deref())?;
    Ok(Json(library.all_files(&station).await?))
}

async fn search(
    State(archives): State<SharedArchives>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let (Some(station), Some(date)) = (params.frequency.as_deref(), params.date.as_deref()) else {
        return Err(ApiError::BadRequest("Frequency and date parameters are required.".to_string()));
    };
    if station.is_empty() || date.is_empty() {
        return Err(ApiError::BadRequest("Frequency and date parameters are required.".to_string()));
    }
    let library = library(&archives, params.archive.as_deref())?;
    match library.search(station, date).await? {
        Resolution::Found(recording) => {
            let url = match params.archive {
                Some(_) => recording.archive_url(),
                None => recording.url(),
            };
            Ok(Json(SearchResponse { success: true, url }))
        },
        Resolution::NotFound { .. } => Err(ApiError::NotFound("File not found.".to_string())),
    }
}

async fn stream_recording(
    State(archives): State<SharedArchives>,
    Path((station, filename)): Path<(String, String)>,
    Query(params): Query<ArchiveParam>,
) -> ApiResult<Response> {
    let recording = library(&archives, params.archive.as_deref())?
        .open(&station, &filename)
        .await?;
    let headers = [
        (CONTENT_TYPE, recording.content_type().to_string()),
        (CONTENT_LENGTH, recording.len().to_string()),
    ];
    let body = Body::from_stream(ReaderStream::new(recording.into_reader()));
    Ok((headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlog_config::{ArchiveConfig, Config};
    use axum::body::to_bytes;
    use axum::http::Request;
    use rstest::rstest;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn record(dir: &TempDir, path: &str, data: &[u8]) {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        record(&dir, "grouped/FM1/2025-01-01T00-00.wav", b"RIFF0000");
        record(&dir, "grouped/FM1/2025-01-01T00-30.wav", b"RIFF0030");
        record(&dir, "grouped/FM1/2025-01-01T01-00.wav", b"RIFF0100");
        record(&dir, "grouped/92.3MHz/2025-08-28T17-19.wav", b"RIFF1719");
        record(&dir, "grouped/stray.wav", b"not a station");
        record(&dir, "secret.wav", b"secret");
        let mut hiroshima = ArchiveConfig::new(dir.path().join("hiroshima"));
        hiroshima.extension = "mp3".to_string();
        let config = Config {
            archives: BTreeMap::from([
                ("grouped".to_string(), ArchiveConfig::new(dir.path().join("grouped"))),
                ("hiroshima".to_string(), hiroshima),
            ]),
            ..Config::default()
        };
        let archives = Archives::from_config(&config).unwrap();
        (dir, router(Arc::new(archives)))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Response) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        (response.status(), response)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, response) = get(app, uri).await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_archives() {
        let (dir, app) = app();
        let (status, body) = get_json(app.clone(), "/api/archives").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "default": "grouped", "archives": ["grouped"] }));

        std::fs::create_dir(dir.path().join("hiroshima")).unwrap();
        let (_, body) = get_json(app, "/api/archives").await;
        assert_eq!(body["archives"], json!(["grouped", "hiroshima"]));
    }

    #[tokio::test]
    async fn test_stations() {
        let (_dir, app) = app();
        let (status, body) = get_json(app.clone(), "/api/stations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "stations": ["92.3MHz", "FM1"] }));
        let (_, body) = get_json(app.clone(), "/api/frequencies").await;
        assert_eq!(body, json!({ "frequencies": ["92.3MHz", "FM1"] }));
        // Root doesn't exist yet.
        let (status, body) = get_json(app, "/api/stations?archive=hiroshima").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "stations": [] }));
    }

    #[tokio::test]
    async fn test_hours_and_files() {
        let (_dir, app) = app();
        let (status, body) = get_json(app.clone(), "/api/available_hours/FM1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["2025-01-01T01", "2025-01-01T00"]));

        let (_, body) = get_json(app.clone(), "/api/files_for_hour/FM1/2025-01-01T00").await;
        assert_eq!(body, json!(["2025-01-01T00-00.wav", "2025-01-01T00-30.wav"]));

        let (_, body) = get_json(app.clone(), "/api/files/FM1").await;
        assert_eq!(
            body,
            json!(["2025-01-01T01-00.wav", "2025-01-01T00-30.wav", "2025-01-01T00-00.wav"])
        );

        let (status, body) = get_json(app, "/api/available_hours/FM9").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_search() {
        let (_dir, app) = app();
        let (status, body) = get_json(app.clone(), "/api/search?frequency=92.3MHz&date=2025-08-28T17-19").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "url": "/recordings/92.3MHz/2025-08-28T17-19.wav" }));

        let (status, body) = get_json(app.clone(), "/api/search?frequency=FM1&date=2025-01-01T01:00").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "/recordings/FM1/2025-01-01T01-00.wav");

        let (status, body) = get_json(app.clone(), "/api/search?frequency=FM1&date=2025-01-01T02-00").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "error": "File not found." }));

        let (status, _) = get_json(app.clone(), "/api/search?frequency=FM1&date=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[case("/api/search")]
    #[case("/api/search?frequency=FM1")]
    #[case("/api/search?date=2025-01-01T01-00")]
    #[case("/api/search?frequency=&date=2025-01-01T01-00")]
    #[tokio::test]
    async fn test_search_requires_parameters(#[case] uri: &str) {
        let (_dir, app) = app();
        let (status, body) = get_json(app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[rstest]
    #[case("/recordings/FM1/2025-01-01T00-30.wav")]
    #[case("/audio/FM1/2025-01-01T00-30.wav")]
    #[tokio::test]
    async fn test_stream_recording(#[case] uri: &str) {
        let (_dir, app) = app();
        let (status, response) = get(app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "audio/wav");
        assert_eq!(response.headers()[CONTENT_LENGTH], "8");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"RIFF0030");
    }

    #[tokio::test]
    async fn test_stream_missing_recording() {
        let (_dir, app) = app();
        let (status, body) = get_json(app, "/recordings/FM1/2025-01-01T02-00.wav").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "File not found.");
    }

    #[rstest]
    #[case("/api/available_hours/stray.wav", StatusCode::OK)]
    #[case("/api/files/stray.wav", StatusCode::OK)]
    #[case("/api/search?frequency=stray.wav&date=2025-01-01T00-00", StatusCode::NOT_FOUND)]
    #[case("/recordings/stray.wav/2025-01-01T00-00.wav", StatusCode::NOT_FOUND)]
    #[tokio::test]
    async fn test_file_named_as_station(#[case] uri: &str, #[case] expected: StatusCode) {
        let (_dir, app) = app();
        let (status, _) = get(app, uri).await;
        assert_eq!(status, expected);
    }

    #[rstest]
    #[case("/recordings/%2E%2E/secret.wav")]
    #[case("/recordings/FM1/..%2F..%2Fsecret.wav")]
    #[case("/api/available_hours/..")]
    #[case("/api/files/%2E%2E")]
    #[case("/api/search?frequency=..&date=2025-01-01T01-00")]
    #[tokio::test]
    async fn test_traversal_is_rejected(#[case] uri: &str) {
        let (_dir, app) = app();
        let (status, _) = get(app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_archive() {
        let (_dir, app) = app();
        let (status, body) = get_json(app, "/api/stations?archive=elsewhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
