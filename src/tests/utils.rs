use crate::app::AppState;
use crate::config::PipelineConfig;
use crate::db::connection::{init_db, Database};
use crate::domain::Source;
use crate::errors::ServerError;
use crate::runs::RunLauncher;
use crate::verify::VerifyOptions;
use astra::{Body, Request, Response};
use http::Method;
use std::io::Read;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Initialize a fresh test DB using the production schema. Keep the `TempDir`
/// alive for as long as the database is used.
pub fn init_test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("test.sqlite3").to_string_lossy().into_owned());

    init_db(&db, "sql/schema.sql")
        .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));

    (dir, db)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Launched {
    Ingest { source: Source, states: Vec<String> },
    Verification(VerifyOptions),
}

/// Records launches instead of starting threads. The registry slot stays
/// claimed, like a run that never finishes.
#[derive(Default)]
pub struct RecordingLauncher {
    pub launched: Mutex<Vec<Launched>>,
}

impl RunLauncher for RecordingLauncher {
    fn launch_ingest(
        &self,
        _app: &AppState,
        source: Source,
        states: Vec<String>,
        _cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        self.launched.lock().unwrap().push(Launched::Ingest { source, states });
        Ok(())
    }

    fn launch_verification(
        &self,
        _app: &AppState,
        options: VerifyOptions,
        _cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        self.launched.lock().unwrap().push(Launched::Verification(options));
        Ok(())
    }
}

pub struct TestApp {
    pub app: AppState,
    pub launcher: Arc<RecordingLauncher>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let (dir, db) = init_test_db();
        let config = PipelineConfig::from_lookup(|_| None).unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let app = AppState::new(db, config, launcher.clone());
        Self {
            app,
            launcher,
            _dir: dir,
        }
    }

    pub fn launched(&self) -> Vec<Launched> {
        self.launcher.launched.lock().unwrap().clone()
    }
}

pub fn get(uri: &str) -> Request {
    http::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(uri: &str, form: &str) -> Request {
    http::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub fn body_string(resp: Response) -> String {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    body
}
