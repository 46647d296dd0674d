use crate::app::AppState;
use crate::db::scrapes::get_recent_scrapes;
use crate::db::stats::get_property_stats;
use crate::db::SqliteStore;
use crate::domain::Source;
use crate::errors::{ResultResp, ServerError};
use crate::responses::{html_response, json_response, redirect};
use crate::sources::regions;
use crate::spreadsheets::export_verified_xlsx;
use crate::templates::pages::{home_page, HomeVm};
use crate::verify::VerifyOptions;
use astra::Request;
use chrono::Utc;
use std::io::Read;

// Dashboard forms are a handful of fields.
const MAX_FORM_BYTES: u64 = 64 * 1024;

pub fn handle(req: Request, app: &AppState) -> ResultResp {
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();

    tracing::debug!(%method, %path, "request");

    match (method.as_str(), path.as_str()) {
        ("GET", "/") => home(app),

        ("POST", "/scraper/start") => start_scraper(&read_form(req)?, app),
        ("POST", "/scraper/stop") => stop_scraper(&read_form(req)?, app),
        ("GET", "/scraper/status") => json_response(&app.status.ingest_snapshot()),

        ("POST", "/checker/start") => start_checker(&read_form(req)?, app),
        ("POST", "/checker/stop") => {
            if app.status.cancel_verification() {
                tracing::info!("verification run cancellation requested");
            }
            redirect("/")
        }
        ("GET", "/checker/status") => json_response(&app.status.verification_snapshot()),
        ("GET", "/checker/download") => download_verified(app),

        _ => Err(ServerError::NotFound),
    }
}

fn home(app: &AppState) -> ResultResp {
    let stats = get_property_stats(&app.db)?;
    let recent_scrapes = app
        .db
        .with_conn(|conn| get_recent_scrapes(conn).map_err(ServerError::from))?;

    html_response(home_page(&HomeVm {
        stats,
        recent_scrapes,
        ingest: app.status.ingest_snapshot(),
        verification: app.status.verification_snapshot(),
    }))
}

fn start_scraper(form: &[(String, String)], app: &AppState) -> ResultResp {
    let source = required_source(form)?;

    let mut states = Vec::new();
    for name in form_values(form, "states") {
        match regions::lookup(name) {
            Some(info) => states.push(info.name.to_string()),
            None => return Err(ServerError::BadRequest(format!("unknown state: {name}"))),
        }
    }
    if states.is_empty() {
        states = regions::all_state_names();
    }

    let cancel = app
        .status
        .begin_ingest(source)
        .ok_or_else(|| ServerError::Conflict(format!("a {source} scrape is already running")))?;

    if let Err(e) = app.launcher.launch_ingest(app, source, states, cancel) {
        app.status.finish_ingest(source);
        return Err(e);
    }

    redirect("/")
}

fn stop_scraper(form: &[(String, String)], app: &AppState) -> ResultResp {
    let source = required_source(form)?;
    if app.status.cancel_ingest(source) {
        tracing::info!(source = %source, "scrape cancellation requested");
    }
    redirect("/")
}

fn start_checker(form: &[(String, String)], app: &AppState) -> ResultResp {
    let mut options = app.config.verify_options();
    apply_checker_form(form, &mut options)?;

    let cancel = app
        .status
        .begin_verification()
        .ok_or_else(|| ServerError::Conflict("a verification run is already running".into()))?;

    if let Err(e) = app.launcher.launch_verification(app, options, cancel) {
        app.status.finish_verification();
        return Err(e);
    }

    redirect("/")
}

fn apply_checker_form(form: &[(String, String)], options: &mut VerifyOptions) -> Result<(), ServerError> {
    options.source = match form_value(form, "source") {
        Some(raw) => Some(raw.parse::<Source>().map_err(ServerError::BadRequest)?),
        None => None,
    };
    options.include_soft_failed = form_flag_or(form, "include_failed", true);
    options.api_error_only = form_flag(form, "retry_api_only");
    options.limit = match form_value(form, "limit") {
        Some(raw) => Some(
            raw.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ServerError::BadRequest(format!("invalid limit: {raw}")))?,
        ),
        None => None,
    };
    Ok(())
}

fn download_verified(app: &AppState) -> ResultResp {
    let store = SqliteStore::new(app.db.clone());
    let properties = store.verified_properties()?;
    tracing::info!(rows = properties.len(), "exporting verified properties");
    export_verified_xlsx(&properties, &Utc::now().format("%Y%m%d").to_string())
}

fn required_source(form: &[(String, String)]) -> Result<Source, ServerError> {
    form_value(form, "source")
        .ok_or_else(|| ServerError::BadRequest("missing source".into()))?
        .parse()
        .map_err(ServerError::BadRequest)
}

/// Reads an `application/x-www-form-urlencoded` body. Keys may repeat.
fn read_form(req: Request) -> Result<Vec<(String, String)>, ServerError> {
    let mut raw = Vec::new();
    req.into_body()
        .reader()
        .take(MAX_FORM_BYTES)
        .read_to_end(&mut raw)
        .map_err(|e| ServerError::BadRequest(format!("unreadable form body: {e}")))?;

    Ok(url::form_urlencoded::parse(&raw).into_owned().collect())
}

/// First non-blank value for `key`.
fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .find(|v| !v.is_empty())
}

fn form_values<'a>(form: &'a [(String, String)], key: &'static str) -> impl Iterator<Item = &'a str> {
    form.iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn form_flag(form: &[(String, String)], key: &str) -> bool {
    form_flag_or(form, key, false)
}

/// `default` when the field is absent.
fn form_flag_or(form: &[(String, String)], key: &str, default: bool) -> bool {
    match form_value(form, key) {
        Some(v) => matches!(v, "true" | "on" | "1"),
        None => default,
    }
}
