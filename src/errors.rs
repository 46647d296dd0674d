// errors.rs
use astra::Response;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors from the persisted store (SQLite).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("open database {path} failed: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to apply schema: {0}")]
    Schema(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("thread-local connection slot unavailable")]
    ConnectionSlot,
}

impl StoreError {
    /// Busy/locked databases and I/O hiccups are worth a reconnect and retry;
    /// constraint and SQL errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Open { .. } | StoreError::ConnectionSlot => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::CannotOpen
            ),
            _ => false,
        }
    }
}

/// Errors originating from either the dashboard logic
/// (routing, bad form input, etc.) or downstream layers (DB, spreadsheets).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database Error: {0}")]
    DbError(String),

    #[error("Spreadsheet Error: {0}")]
    XlsxError(String),

    #[error("Internal Server Error")]
    InternalError,
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        ServerError::DbError(e.to_string())
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::DbError(e.to_string())
    }
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;
