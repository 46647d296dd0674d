use crate::ingest::IngestSettings;
use crate::verify::VerifyOptions;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_path: String,
    pub schema_path: String,
    pub bind_addr: SocketAddr,
    pub server_workers: usize,
    pub check_address_base_url: Url,
    pub early_stop_threshold: usize,
    pub verify_batch_size: usize,
    pub status_batch_size: usize,
    pub breaker_threshold: u32,
    pub pause_every_calls: u64,
    pub pause: Duration,
    pub upsert_batch_size: usize,
    pub exists_chunk_size: usize,
}

impl PipelineConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, ".env present but unreadable");
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url: Url = parse(
            &lookup,
            "CHECK_ADDRESS_BASE_URL",
            Url::parse("http://api.sfr3.com/sfr3/offmarket/").map_err(|e| ConfigError::Invalid {
                key: "CHECK_ADDRESS_BASE_URL",
                value: String::new(),
                reason: e.to_string(),
            })?,
        )?;

        Ok(Self {
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "listings.sqlite3".into()),
            schema_path: lookup("SCHEMA_PATH").unwrap_or_else(|| "sql/schema.sql".into()),
            bind_addr: parse(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            server_workers: parse(&lookup, "SERVER_WORKERS", 8)?,
            check_address_base_url: with_trailing_slash(base_url),
            early_stop_threshold: parse(&lookup, "EARLY_STOP_THRESHOLD", 1000)?,
            verify_batch_size: parse(&lookup, "VERIFY_BATCH_SIZE", 1000)?,
            status_batch_size: parse(&lookup, "STATUS_BATCH_SIZE", 100)?,
            breaker_threshold: parse(&lookup, "BREAKER_THRESHOLD", 20)?,
            pause_every_calls: parse(&lookup, "PAUSE_EVERY_CALLS", 10)?,
            pause: Duration::from_secs(parse(&lookup, "PAUSE_SECS", 5)?),
            upsert_batch_size: parse(&lookup, "UPSERT_BATCH_SIZE", 1000)?,
            exists_chunk_size: parse(&lookup, "EXISTS_CHUNK_SIZE", 1000)?,
        })
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            early_stop_threshold: self.early_stop_threshold,
            exists_chunk: self.exists_chunk_size,
            upsert_batch: self.upsert_batch_size,
        }
    }

    /// Defaults for a verification run; the dashboard form fills in the rest.
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            batch_size: self.verify_batch_size,
            status_batch_size: self.status_batch_size,
            breaker_threshold: self.breaker_threshold,
            ..Default::default()
        }
    }
}

fn parse<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

// `Url::join` drops the last path segment unless the base ends in '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
