use crate::db::connection::Database;
use crate::errors::ServerError;
use rusqlite::Connection;

/// Counts shown on the dashboard home page.
#[derive(Debug, Default)]
pub struct PropertyStats {
    pub total: i64,
    pub verified: i64,
    pub by_source: Vec<(String, i64)>,
    pub by_state: Vec<(String, i64)>,
    pub by_failure_reason: Vec<(String, i64)>,
}

fn grouped_counts(conn: &Connection, sql: &str) -> Result<Vec<(String, i64)>, ServerError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?, // group key
            row.get::<_, i64>(1)?,    // n
        ))
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_property_stats(db: &Database) -> Result<PropertyStats, ServerError> {
    db.with_conn(|conn| {
        let total = conn.query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))?;
        let verified = conn.query_row(
            "SELECT COUNT(*) FROM properties WHERE is_verified = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(PropertyStats {
            total,
            verified,
            by_source: grouped_counts(
                conn,
                "SELECT source, COUNT(*) FROM properties GROUP BY source ORDER BY source",
            )?,
            by_state: grouped_counts(
                conn,
                "SELECT state, COUNT(*) AS n FROM properties GROUP BY state ORDER BY n DESC, state",
            )?,
            by_failure_reason: grouped_counts(
                conn,
                "SELECT failure_reason, COUNT(*) FROM properties WHERE failure_reason IS NOT NULL GROUP BY failure_reason ORDER BY failure_reason",
            )?,
        })
    })
}
