use crate::domain::VerificationCounts;
use crate::errors::StoreError;
use rusqlite::{params, Connection};

pub fn start_verification_run(conn: &Connection, now: i64) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO verification_runs (started_at) VALUES (?)",
        params![now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn end_verification_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    counts: &VerificationCounts,
    outcome: &str,
    halt_message: Option<&str>,
) -> Result<(), StoreError> {
    conn.execute(
        r#"
        UPDATE verification_runs
        SET finished_at = ?, processed = ?, verified = ?, failed = ?, api_error = ?,
            outcome = ?, halt_message = ?
        WHERE id = ?
        "#,
        params![
            now,
            counts.processed as i64,
            counts.verified as i64,
            counts.failed as i64,
            counts.api_error as i64,
            outcome,
            halt_message,
            run_id
        ],
    )?;
    Ok(())
}
