pub mod app;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod ingest;
pub mod pacing;
pub mod responses;
pub mod router;
pub mod runs;
pub mod sources;
pub mod spreadsheets;
pub mod templates;
pub mod verify;

pub use app::AppState;
pub use db::{init_db, Database};
pub use router::handle;

#[cfg(test)]
mod tests;
