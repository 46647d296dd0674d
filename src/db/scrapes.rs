use crate::domain::Source;
use crate::errors::StoreError;
use rusqlite::{params, Connection};

#[derive(Debug)]
pub struct ScrapeRun {
    pub id: i64,
    pub source: String,
    pub states: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub pages_fetched: Option<i64>,
    pub inserted: Option<i64>,
    pub skipped: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Totals written when a run finishes.
#[derive(Debug, Clone, Default)]
pub struct ScrapeRunTotals {
    pub pages_fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
}

pub fn start_scrape_run(
    conn: &Connection,
    source: Source,
    states: &[String],
    now: i64,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO scrape_runs (source, states, started_at, success) VALUES (?, ?, ?, 0)",
        params![source, states.join(","), now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn end_scrape_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    totals: &ScrapeRunTotals,
    success: bool,
    error: Option<String>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE scrape_runs SET finished_at = ?, pages_fetched = ?, inserted = ?, skipped = ?, success = ?, error_message = ? WHERE id = ?",
        params![
            now,
            totals.pages_fetched as i64,
            totals.inserted as i64,
            totals.skipped as i64,
            success,
            error,
            run_id
        ],
    )?;
    Ok(())
}

pub fn get_recent_scrapes(conn: &Connection) -> Result<Vec<ScrapeRun>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, source, states, started_at, finished_at, pages_fetched, inserted, skipped, success, error_message FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT 50",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ScrapeRun {
            id: row.get(0)?,
            source: row.get(1)?,
            states: row.get(2)?,
            started_at: row.get(3)?,
            finished_at: row.get(4)?,
            pages_fetched: row.get(5)?,
            inserted: row.get(6)?,
            skipped: row.get(7)?,
            success: row.get(8)?,
            error_message: row.get(9)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{init_db, Database};

    #[test]
    fn run_journal_records_start_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("runs.sqlite").to_string_lossy().to_string());
        init_db(&db, "sql/schema.sql").unwrap();

        let runs = db
            .with_conn(|conn| -> Result<Vec<ScrapeRun>, StoreError> {
                let id = start_scrape_run(conn, Source::Realtor, &["Ohio".into(), "Kansas".into()], 100)?;
                let totals = ScrapeRunTotals {
                    pages_fetched: 4,
                    inserted: 30,
                    skipped: 10,
                };
                end_scrape_run(conn, id, 200, &totals, true, None)?;
                get_recent_scrapes(conn)
            })
            .unwrap();

        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.source, "realtor");
        assert_eq!(run.states, "Ohio,Kansas");
        assert_eq!(run.finished_at, Some(200));
        assert_eq!(run.inserted, Some(30));
        assert!(run.success);
    }
}
