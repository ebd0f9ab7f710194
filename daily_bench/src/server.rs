//! HTTP front end of the benchmark history.
//!
//! Pages are rendered from the view current at request time. Uploaded runs
//! are persisted to the data directory before they are published, and a run
//! whose date and commit are already known is refused.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::{
    data::{BenchmarkOutput, Metric, Series},
    defaults, ingest,
    publisher::SnapshotPublisher,
    reporting::{self, page_path},
    storage,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub publisher: Arc<SnapshotPublisher>,
    pub data_dir: Arc<PathBuf>,
    pub title: Arc<str>,
    upload_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(publisher: SnapshotPublisher, data_dir: PathBuf, title: &str) -> AppState {
        AppState {
            publisher: Arc::new(publisher),
            data_dir: Arc::new(data_dir),
            title: Arc::from(title),
            upload_lock: Arc::new(Mutex::new(())),
        }
    }

    fn page(&self, metric: Metric) -> Html<String> {
        let view = self.publisher.current_view();
        Html(reporting::render_page(&view, metric, &self.title))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(page_path(Metric::NsPerOp), get(ns_page))
        .route(page_path(Metric::AllocsPerOp), get(allocs_page))
        .route(page_path(Metric::BytesPerOp), get(bytes_page))
        .route("/series", get(series))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(defaults::DEFAULT_UPLOAD_LIMIT))
        .with_state(state)
}

async fn ns_page(State(state): State<AppState>) -> Html<String> {
    state.page(Metric::NsPerOp)
}

async fn allocs_page(State(state): State<AppState>) -> Html<String> {
    state.page(Metric::AllocsPerOp)
}

async fn bytes_page(State(state): State<AppState>) -> Html<String> {
    state.page(Metric::BytesPerOp)
}

async fn series(State(state): State<AppState>) -> Json<Series> {
    Json(state.publisher.current_view().series.clone())
}

enum Upload {
    Stored(PathBuf),
    Duplicate(PathBuf),
}

/// Persists and publishes `output` unless the same run is already known.
fn store_upload(state: &AppState, output: BenchmarkOutput) -> Result<Upload> {
    // Check and write under one lock so two uploads of a run cannot both pass
    let _guard = state.upload_lock.lock();

    let path = storage::output_path(&state.data_dir, &output)?;
    if path.exists() || state.publisher.store().contains(&output.date, &output.commit) {
        return Ok(Upload::Duplicate(path));
    }

    let path = storage::write_output(&state.data_dir, &output)?;
    state.publisher.ingest(output);
    Ok(Upload::Stored(path))
}

async fn upload(State(state): State<AppState>, body: Bytes) -> (StatusCode, String) {
    let output = match ingest::decode(&body) {
        Ok(output) => output,
        Err(e) => {
            warn!("Rejected upload: {e}");
            return (StatusCode::BAD_REQUEST, format!("{e}\n"));
        }
    };

    let stored = tokio::task::spawn_blocking(move || store_upload(&state, output)).await;

    match stored {
        Ok(Ok(Upload::Stored(path))) => {
            info!("Stored upload as {}", path.display());
            (StatusCode::CREATED, format!("stored {}\n", path.display()))
        }
        Ok(Ok(Upload::Duplicate(path))) => {
            warn!("Rejected upload: {} is known already", path.display());
            (
                StatusCode::CONFLICT,
                format!("run {} is known already\n", path.display()),
            )
        }
        Ok(Err(e)) => {
            error!("Failed to store upload: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}\n"))
        }
        Err(e) => {
            error!("Upload task failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n"))
        }
    }
}

pub async fn serve(state: AppState, listen: &str) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to listen on {listen}"))?;
    info!("Serving benchmark history on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .context("Server failed")
}

/// Seeds a publisher from `data_dir` and serves it until the process ends.
pub fn run(data_dir: &Path, listen: &str, title: &str) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create directory {}", data_dir.display()))?;
    let seed = storage::load_data_dir(data_dir)?;
    let publisher = SnapshotPublisher::new(seed);
    let state = AppState::new(publisher, data_dir.to_path_buf(), title);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?
        .block_on(serve(state, listen))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{BenchmarkOutput, BenchmarkResult};
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn run(date: &str, commit: &str, ns_per_op: i64) -> BenchmarkOutput {
        BenchmarkOutput {
            date: date.to_string(),
            commit: commit.to_string(),
            results: vec![BenchmarkResult {
                name: "BenchmarkBasic".to_string(),
                ns_per_op,
                allocs_per_op: 3,
                bytes_per_op: 96,
            }],
        }
    }

    fn state(temp_dir: &TempDir, seed: Vec<BenchmarkOutput>) -> AppState {
        AppState::new(
            SnapshotPublisher::new(seed),
            temp_dir.path().join("data"),
            "Test History",
        )
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn post_body(app: Router, body: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_pages() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(state(&temp_dir, vec![run("1620259200", "c1", 100)]));

        let (status, page) = get_body(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("<h2>ns/op</h2>"));
        assert!(page.contains("BenchmarkBasic"));
        assert!(page.contains("Test History"));

        let (status, page) = get_body(app.clone(), "/alloc").await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("<h2>allocs/op</h2>"));

        let (status, page) = get_body(app.clone(), "/bytes").await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("<h2>B/op</h2>"));

        let (status, _) = get_body(app, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_is_stored_and_published() {
        let temp_dir = TempDir::new().unwrap();
        let state = state(&temp_dir, vec![run("1620345600", "c2", 150)]);
        let app = router(state.clone());

        let body = serde_json::to_string(&run("1620259200", "c1", 100)).unwrap();
        let (status, _) = post_body(app.clone(), &body).await;
        assert_eq!(status, StatusCode::CREATED);

        assert!(temp_dir
            .path()
            .join("data")
            .join("2021-05-06_c1.json")
            .is_file());
        assert_eq!(state.publisher.current_view().outputs, 2);

        let (status, json) = get_body(app, "/series").await;
        assert_eq!(status, StatusCode::OK);
        let series: Series = serde_json::from_str(&json).unwrap();
        let values: Vec<_> = series["BenchmarkBasic"]
            .iter()
            .map(|o| o.result.ns_per_op)
            .collect();
        assert_eq!(values, [100, 150]);
    }

    #[tokio::test]
    async fn test_upload_of_known_run_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        let state = state(&temp_dir, Vec::new());
        let app = router(state.clone());

        let body = serde_json::to_string(&run("1620259200", "c1", 100)).unwrap();
        let (status, _) = post_body(app.clone(), &body).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, message) = post_body(app.clone(), &body).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(message.contains("2021-05-06_c1.json"));

        // Same file name from a later time of the same day
        let body = serde_json::to_string(&run("1620262800", "c1", 999)).unwrap();
        let (status, _) = post_body(app, &body).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let view = state.publisher.current_view();
        assert_eq!(view.outputs, 1);
        assert_eq!(view.series["BenchmarkBasic"].len(), 1);

        let data_dir = temp_dir.path().join("data");
        let stored = storage::load_data_dir(&data_dir).unwrap();
        assert_eq!(stored, [run("1620259200", "c1", 100)]);
    }

    #[tokio::test]
    async fn test_upload_of_seeded_run_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        // Seeded runs need not be on disk under this data directory
        let state = state(&temp_dir, vec![run("1620259200", "c1", 100)]);

        let body = serde_json::to_string(&run("1620259200", "c1", 100)).unwrap();
        let (status, _) = post_body(router(state.clone()), &body).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(state.publisher.current_view().outputs, 1);
        assert!(!temp_dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_runs() {
        let temp_dir = TempDir::new().unwrap();
        let state = state(&temp_dir, Vec::new());
        let app = router(state.clone());

        let (status, message) = post_body(app.clone(), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("cannot decode"));

        let (status, _) =
            post_body(app, r#"{"Date":"yesterday","Commit":"abc","Result":[]}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(state.publisher.current_view().outputs, 0);
        assert!(!temp_dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_upload_persist_failure() {
        let temp_dir = TempDir::new().unwrap();
        // A file where the data directory should be
        fs::write(temp_dir.path().join("data"), "").unwrap();
        let state = state(&temp_dir, Vec::new());

        let body = serde_json::to_string(&run("1620259200", "c1", 100)).unwrap();
        let (status, _) = post_body(router(state.clone()), &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.publisher.current_view().outputs, 0);
    }
}
