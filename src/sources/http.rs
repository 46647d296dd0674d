use crate::sources::SourceError;
use reqwest::blocking::{Client, Response};
use std::time::Duration;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// Error bodies are logged, not stored; keep them short.
const MAX_ERROR_BODY: usize = 300;

pub fn build_client() -> Result<Client, SourceError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| SourceError::Client(e.to_string()))
}

/// Reads the body, turning non-2xx statuses into `SourceError::Status`.
pub fn read_body(resp: Response) -> Result<String, SourceError> {
    let status = resp.status();
    let text = resp.text()?;

    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            body: truncate(&text, MAX_ERROR_BODY),
        });
    }
    Ok(text)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
