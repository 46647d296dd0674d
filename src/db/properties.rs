use crate::db::connection::Database;
use crate::db::store::{
    PropertyStore, SelectedProperty, SelectionCursor, SelectionQuery, StatusUpdateReport,
};
use crate::domain::{FailureReason, PropertyRecord, VerificationOutcome};
use crate::errors::StoreError;
use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Row};
use std::collections::{BTreeMap, HashSet};

const SELECT_COLUMNS: &str = r#"
    id, property_id, state, property_type, occupancy_status, address, zip_code,
    square_footage, bedrooms, bathrooms, year_built, after_repair_value, url,
    source, is_verified, failure_reason, date_added
"#;

// Upper bound on ids bound into a single `IN (...)` update.
const UPDATE_CHUNK: usize = 500;

/// `PropertyStore` backed by the SQLite `properties` table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Verified properties for the download, oldest first.
    pub fn verified_properties(&self) -> Result<Vec<PropertyRecord>, StoreError> {
        self.db.with_retry("verified_properties", |conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM properties WHERE is_verified = 1 ORDER BY date_added, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| Ok(row_to_selected(row)?.record))?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn row_to_selected(row: &Row<'_>) -> rusqlite::Result<SelectedProperty> {
    let row_id: i64 = row.get("id")?;
    let date_added = row.get("date_added")?;

    let record = PropertyRecord {
        property_id: row.get("property_id")?,
        state: row.get("state")?,
        property_type: row.get("property_type")?,
        occupancy_status: row.get("occupancy_status")?,
        address: row.get("address")?,
        zip_code: row.get("zip_code")?,
        square_footage: row.get("square_footage")?,
        bedrooms: row.get("bedrooms")?,
        bathrooms: row.get("bathrooms")?,
        year_built: row.get("year_built")?,
        after_repair_value: row.get("after_repair_value")?,
        url: row.get("url")?,
        source: row.get("source")?,
        is_verified: row.get("is_verified")?,
        failure_reason: row.get("failure_reason")?,
        date_added: Some(date_added),
    };

    Ok(SelectedProperty {
        record,
        cursor: SelectionCursor { date_added, row_id },
    })
}

impl PropertyStore for SqliteStore {
    fn exists_batch(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.db.with_retry("exists_batch", |conn| {
            let sql = format!(
                "SELECT property_id FROM properties WHERE property_id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), |row| row.get(0))?;

            let mut existing = HashSet::new();
            for r in rows {
                existing.insert(r?);
            }
            Ok(existing)
        })
    }

    fn insert_batch(&self, records: &[PropertyRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        self.db.with_retry("insert_batch", |conn| {
            let now = Utc::now().naive_utc();
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                // ON CONFLICT DO NOTHING: a concurrent first sighting of the same
                // property_id is a no-op, not an error.
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO properties (
                        property_id, state, property_type, occupancy_status, address, zip_code,
                        square_footage, bedrooms, bathrooms, year_built, after_repair_value, url,
                        source, is_verified, failure_reason, date_added
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, NULL, ?14)
                    ON CONFLICT(property_id) DO NOTHING
                    "#,
                )?;

                for record in records {
                    inserted += stmt.execute(params![
                        &record.property_id,
                        &record.state,
                        &record.property_type,
                        &record.occupancy_status,
                        &record.address,
                        &record.zip_code,
                        record.square_footage,
                        record.bedrooms,
                        record.bathrooms,
                        record.year_built,
                        record.after_repair_value,
                        &record.url,
                        &record.source,
                        now,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    fn update_status_batch(
        &self,
        outcomes: &[VerificationOutcome],
    ) -> Result<StatusUpdateReport, StoreError> {
        if outcomes.is_empty() {
            return Ok(StatusUpdateReport::default());
        }

        let verified_ids: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.verified)
            .map(|o| o.property_id.as_str())
            .collect();

        let mut failure_groups: BTreeMap<Option<FailureReason>, Vec<&str>> = BTreeMap::new();
        for outcome in outcomes.iter().filter(|o| !o.verified) {
            failure_groups
                .entry(outcome.failure_reason)
                .or_default()
                .push(outcome.property_id.as_str());
        }

        let updated = self.db.with_retry("update_status_batch", |conn| {
            let tx = conn.transaction()?;
            let mut updated = 0;

            for chunk in verified_ids.chunks(UPDATE_CHUNK) {
                let sql = format!(
                    "UPDATE properties SET is_verified = 1, failure_reason = NULL WHERE property_id IN ({})",
                    placeholders(chunk.len())
                );
                updated += tx.execute(&sql, params_from_iter(chunk.iter()))?;
            }

            for (reason, ids) in &failure_groups {
                for chunk in ids.chunks(UPDATE_CHUNK) {
                    let sql = format!(
                        "UPDATE properties SET is_verified = 0, failure_reason = ? WHERE property_id IN ({})",
                        placeholders(chunk.len())
                    );
                    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() + 1);
                    values.push(reason);
                    for id in chunk {
                        values.push(id);
                    }
                    updated += tx.execute(&sql, values.as_slice())?;
                }
            }

            tx.commit()?;
            Ok(updated)
        })?;

        let not_found = outcomes.len().saturating_sub(updated);
        if not_found > 0 {
            tracing::warn!(not_found, "some verification outcomes matched no property");
        }

        Ok(StatusUpdateReport { updated, not_found })
    }

    fn select_unverified(
        &self,
        query: &SelectionQuery,
    ) -> Result<Vec<SelectedProperty>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        // Terminal failures are never reselected, whatever the flags say.
        let soft: Vec<FailureReason> = FailureReason::ALL
            .into_iter()
            .filter(FailureReason::is_soft)
            .collect();
        let soft_in = format!("failure_reason IN ({})", placeholders(soft.len()));

        if query.api_error_only {
            clauses.push(format!("is_verified = 0 AND {soft_in}"));
        } else {
            clauses.push(format!("is_verified = 0 AND (failure_reason IS NULL OR {soft_in})"));
        }
        for reason in soft {
            values.push(Box::new(reason));
        }

        if let Some(source) = query.source {
            clauses.push("source = ?".into());
            values.push(Box::new(source));
        }

        if let Some(after) = &query.after {
            clauses.push("(date_added, id) > (?, ?)".into());
            values.push(Box::new(after.date_added));
            values.push(Box::new(after.row_id));
        }

        values.push(Box::new(query.batch_size as i64));

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM properties WHERE {} ORDER BY date_added ASC, id ASC LIMIT ?",
            clauses.join(" AND ")
        );

        let selected = self.db.with_retry("select_unverified", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), row_to_selected)?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })?;

        tracing::debug!(
            count = selected.len(),
            include_soft_failed = query.include_soft_failed,
            api_error_only = query.api_error_only,
            "selected properties for verification"
        );
        Ok(selected)
    }
}
