use crate::error::{is_unique_violation, Result, StoreError};
use chrono::{DateTime, Utc};
use rsvp_core::domain::{
    fold_name_key, Rsvp, RsvpId, RsvpSubmission, SubmitOutcome, SubmitterMetadata,
};
use rsvp_core::rules::RsvpCounts;
use rsvp_core::time::from_unix_millis;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::str::FromStr;

const SELECT_COLUMNS: &str =
    "SELECT id, name, attending, comment, timestamp, ip_address, user_agent FROM rsvps";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpSummary {
    pub records: Vec<Rsvp>,
    pub counts: RsvpCounts,
}

pub struct RsvpsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> RsvpsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Creates a record for a never-seen name or overwrites the mutable fields
    /// of the record whose name matches case-insensitively.
    ///
    /// An insert that loses a race on the unique name key is retried once as
    /// an update.
    pub fn submit(
        &self,
        now_utc: DateTime<Utc>,
        submission: &RsvpSubmission,
        metadata: &SubmitterMetadata,
    ) -> Result<SubmitOutcome> {
        match self.write(|conn| submit_inner(conn, now_utc, submission, metadata)) {
            Err(StoreError::Conflict(_)) => {
                self.write(|conn| submit_inner(conn, now_utc, submission, metadata))
            }
            other => other,
        }
    }

    pub fn get(&self, id: RsvpId) -> Result<Option<Rsvp>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(rsvp_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Exact, case-insensitive lookup. `name` is trimmed but not otherwise
    /// normalized.
    pub fn find_by_name(&self, name: &str) -> Result<Option<Rsvp>> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        find_by_key(self.conn, &fold_name_key(trimmed))
    }

    /// All records, most recently written first.
    pub fn list_all(&self) -> Result<Vec<Rsvp>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY timestamp DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(rsvp_from_row(row)?);
        }
        Ok(records)
    }

    pub fn summary(&self) -> Result<RsvpSummary> {
        let records = self.list_all()?;
        let counts = RsvpCounts::from_records(&records);
        Ok(RsvpSummary { records, counts })
    }

    /// Aggregate counts without loading any rows.
    pub fn counts(&self) -> Result<RsvpCounts> {
        let (total, attending): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE attending = 1) FROM rsvps;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(RsvpCounts::from_totals(
            total.max(0) as u64,
            attending.max(0) as u64,
        ))
    }

    pub fn count(&self) -> Result<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM rsvps;", [], |row| row.get(0))?;
        Ok(total.max(0) as u64)
    }

    fn write<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.conn.is_autocommit() {
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            let value = op(&tx)?;
            tx.commit()?;
            Ok(value)
        } else {
            op(self.conn)
        }
    }
}

fn submit_inner(
    conn: &Connection,
    now_utc: DateTime<Utc>,
    submission: &RsvpSubmission,
    metadata: &SubmitterMetadata,
) -> Result<SubmitOutcome> {
    let key = submission.name.key();
    match find_by_key(conn, &key)? {
        Some(existing) => update_existing(conn, now_utc, existing, submission, metadata).map(
            |record| SubmitOutcome::Updated {
                record,
                submitted_name: submission.name.as_str().to_string(),
            },
        ),
        None => insert_new(conn, now_utc, &key, submission, metadata).map(SubmitOutcome::Created),
    }
}

fn update_existing(
    conn: &Connection,
    now_utc: DateTime<Utc>,
    existing: Rsvp,
    submission: &RsvpSubmission,
    metadata: &SubmitterMetadata,
) -> Result<Rsvp> {
    let rsvp = Rsvp {
        id: existing.id,
        name: existing.name,
        attending: submission.attending,
        comment: submission.comment.clone(),
        timestamp: now_utc,
        metadata: metadata.clone(),
    };

    let updated = conn.execute(
        "UPDATE rsvps
         SET attending = ?1, comment = ?2, timestamp = ?3, ip_address = ?4, user_agent = ?5
         WHERE id = ?6;",
        params![
            rsvp.attending,
            rsvp.comment,
            rsvp.timestamp.timestamp_millis(),
            rsvp.metadata.ip_address,
            rsvp.metadata.user_agent,
            rsvp.id.to_string(),
        ],
    )?;
    if updated != 1 {
        return Err(StoreError::NotFound(rsvp.id.to_string()));
    }

    Ok(rsvp)
}

fn insert_new(
    conn: &Connection,
    now_utc: DateTime<Utc>,
    key: &str,
    submission: &RsvpSubmission,
    metadata: &SubmitterMetadata,
) -> Result<Rsvp> {
    let rsvp = Rsvp {
        id: RsvpId::new(),
        name: submission.name.as_str().to_string(),
        attending: submission.attending,
        comment: submission.comment.clone(),
        timestamp: now_utc,
        metadata: metadata.clone(),
    };

    let inserted = conn.execute(
        "INSERT INTO rsvps (id, name, name_key, attending, comment, timestamp, ip_address, user_agent)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            rsvp.id.to_string(),
            rsvp.name,
            key,
            rsvp.attending,
            rsvp.comment,
            rsvp.timestamp.timestamp_millis(),
            rsvp.metadata.ip_address,
            rsvp.metadata.user_agent,
        ],
    );
    match inserted {
        Ok(_) => Ok(rsvp),
        Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(rsvp.name)),
        Err(err) => Err(err.into()),
    }
}

fn find_by_key(conn: &Connection, key: &str) -> Result<Option<Rsvp>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE name_key = ?1;"))?;
    stmt.query_row([key], |row| Ok(rsvp_from_row(row)))
        .optional()?
        .transpose()
}

fn rsvp_from_row(row: &rusqlite::Row<'_>) -> Result<Rsvp> {
    let id_str: String = row.get(0)?;
    let id = RsvpId::from_str(&id_str).map_err(|_| StoreError::InvalidId(id_str.clone()))?;
    let millis: i64 = row.get(4)?;
    let timestamp = from_unix_millis(millis).ok_or(StoreError::InvalidTimestamp(millis))?;
    Ok(Rsvp {
        id,
        name: row.get(1)?,
        attending: row.get(2)?,
        comment: row.get(3)?,
        timestamp,
        metadata: SubmitterMetadata {
            ip_address: row.get(5)?,
            user_agent: row.get(6)?,
        },
    })
}
