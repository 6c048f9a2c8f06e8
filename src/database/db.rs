//! Database operations for the review store
//!
//! Handles SQLite database initialization, enrollment of concepts, SM-2 review
//! submission, due-review queries and the simulated current date.

use crate::error::{Error, Result};
use crate::models::sm2::schedule_review;
use crate::models::{ReviewLogEntry, ReviewQuality, ReviewRecord, ReviewStats, ScheduledReview};
use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// How long a writer waits for another connection's transaction to finish
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const RECORD_COLUMNS: &str = "student_id, concept_id, subject_id, interval_days, repetitions, \
     ease_factor, last_reviewed_at, next_review_at";

/// Opens (or creates) the SQLite database at `path` and ensures the schema exists
///
/// Sets current date to now if not already initialized.
pub fn init_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    create_schema(&conn)?;
    info!("Review store opened at {}", path.display());
    Ok(conn)
}

/// Same as [`init_database`] but backed by memory; used by tests and dry runs
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    // One row per (student, concept); updated in place, never deleted
    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_records (
            student_id TEXT NOT NULL,
            concept_id TEXT NOT NULL,
            subject_id TEXT,
            interval_days INTEGER NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            last_reviewed_at INTEGER,
            next_review_at INTEGER NOT NULL,
            PRIMARY KEY (student_id, concept_id)
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            concept_id TEXT NOT NULL,
            quality INTEGER NOT NULL,
            reviewed_at INTEGER NOT NULL,
            interval_days INTEGER NOT NULL,
            ease_factor REAL NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_review_log_pair
         ON review_log (student_id, concept_id)",
        (),
    )?;

    // Create app_state table for storing current date
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![Utc::now().timestamp().to_string()],
    )?;

    Ok(())
}

fn from_timestamp(column: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, secs))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewRecord> {
    let last_reviewed_at = match row.get::<_, Option<i64>>(6)? {
        Some(secs) => Some(from_timestamp(6, secs)?),
        None => None,
    };
    Ok(ReviewRecord {
        student_id: row.get(0)?,
        concept_id: row.get(1)?,
        subject_id: row.get(2)?,
        interval_days: row.get(3)?,
        repetitions: row.get(4)?,
        ease_factor: row.get(5)?,
        last_reviewed_at,
        next_review_at: from_timestamp(7, row.get(7)?)?,
    })
}

/// Retrieves current simulated date from database
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let timestamp: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    let secs = timestamp
        .parse::<i64>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    Ok(from_timestamp(0, secs)?)
}

/// Overrides the simulated date
pub fn set_current_date(date: DateTime<Utc>, conn: &Connection) -> Result<()> {
    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
        params![date.timestamp().to_string()],
    )?;
    Ok(())
}

/// Advances current date by 24 hours (for exercising the schedule without waiting)
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let next_day = get_current_date(conn)? + TimeDelta::days(1);
    set_current_date(next_day, conn)?;
    info!("Current date advanced to {}", next_day.to_rfc3339());
    Ok(next_day)
}

/// Starts tracking a concept for a student; the concept is due right away
///
/// Enrolling an already tracked pair leaves its progress untouched and
/// returns the existing record.
pub fn enroll_concept(
    student_id: &str,
    concept_id: &str,
    subject_id: Option<&str>,
    conn: &Connection,
) -> Result<ReviewRecord> {
    let record = ReviewRecord::new(student_id, concept_id, subject_id, get_current_date(conn)?);

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO review_records
         (student_id, concept_id, subject_id, interval_days, repetitions, ease_factor, last_reviewed_at, next_review_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
        params![
            record.student_id,
            record.concept_id,
            record.subject_id,
            record.interval_days,
            record.repetitions,
            record.ease_factor,
            record.next_review_at.timestamp(),
        ],
    )?;

    if inserted == 1 {
        info!(student_id, concept_id, "Concept enrolled");
        Ok(record)
    } else {
        debug!(student_id, concept_id, "Concept already enrolled");
        get_review_record(student_id, concept_id, conn)?
            .ok_or_else(|| Error::NotFound(format!("{student_id}/{concept_id}")))
    }
}

pub fn get_review_record(
    student_id: &str,
    concept_id: &str,
    conn: &Connection,
) -> Result<Option<ReviewRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM review_records
                 WHERE student_id = ?1 AND concept_id = ?2"
            ),
            params![student_id, concept_id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Applies one graded review to a stored record using SM-2
///
/// Runs as a single IMMEDIATE transaction, so concurrent submissions for the
/// same pair are serialized by SQLite. A rejected state leaves the record and
/// the log untouched.
pub fn submit_review(
    student_id: &str,
    concept_id: &str,
    quality: ReviewQuality,
    conn: &mut Connection,
) -> Result<ReviewRecord> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut record = get_review_record(student_id, concept_id, &tx)?
        .ok_or_else(|| Error::NotFound(format!("{student_id}/{concept_id}")))?;
    let reviewed_at = get_current_date(&tx)?;

    let scheduled: ScheduledReview = schedule_review(&record.state(), quality, reviewed_at)?;

    record.repetitions = scheduled.repetitions;
    record.ease_factor = scheduled.ease_factor;
    record.interval_days = scheduled.interval_days;
    record.last_reviewed_at = Some(reviewed_at);
    record.next_review_at = scheduled.next_review_at;

    tx.execute(
        "UPDATE review_records
         SET interval_days = ?1, repetitions = ?2, ease_factor = ?3,
             last_reviewed_at = ?4, next_review_at = ?5
         WHERE student_id = ?6 AND concept_id = ?7",
        params![
            record.interval_days,
            record.repetitions,
            record.ease_factor,
            reviewed_at.timestamp(),
            record.next_review_at.timestamp(),
            student_id,
            concept_id,
        ],
    )?;

    tx.execute(
        "INSERT INTO review_log (student_id, concept_id, quality, reviewed_at, interval_days, ease_factor)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            student_id,
            concept_id,
            quality.value(),
            reviewed_at.timestamp(),
            record.interval_days,
            record.ease_factor,
        ],
    )?;

    tx.commit()?;

    info!(
        student_id,
        concept_id,
        quality = quality.value(),
        interval_days = record.interval_days,
        "Review submitted"
    );
    Ok(record)
}

/// Inserts or overwrites a whole record (used by import)
pub fn upsert_record(record: &ReviewRecord, conn: &Connection) -> Result<()> {
    record.validate()?;

    conn.execute(
        "INSERT INTO review_records
         (student_id, concept_id, subject_id, interval_days, repetitions, ease_factor, last_reviewed_at, next_review_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (student_id, concept_id) DO UPDATE SET
            subject_id = excluded.subject_id,
            interval_days = excluded.interval_days,
            repetitions = excluded.repetitions,
            ease_factor = excluded.ease_factor,
            last_reviewed_at = excluded.last_reviewed_at,
            next_review_at = excluded.next_review_at",
        params![
            record.student_id,
            record.concept_id,
            record.subject_id,
            record.interval_days,
            record.repetitions,
            record.ease_factor,
            record.last_reviewed_at.map(|d| d.timestamp()),
            record.next_review_at.timestamp(),
        ],
    )?;
    Ok(())
}

/// Retrieves a student's concepts due for review
///
/// Returns records where next_review_at <= current_date, optionally limited
/// to one subject, ordered by next_review_at (oldest first).
pub fn get_due_reviews(
    student_id: &str,
    subject_id: Option<&str>,
    conn: &Connection,
) -> Result<Vec<ReviewRecord>> {
    let current_timestamp = get_current_date(conn)?.timestamp();

    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM review_records
         WHERE student_id = ?1
           AND next_review_at <= ?2
           AND (?3 IS NULL OR subject_id = ?3)
         ORDER BY next_review_at ASC, concept_id ASC"
    ))?;

    let records = stmt
        .query_map(params![student_id, current_timestamp, subject_id], record_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(records)
}

/// All records of a student, ordered by concept
pub fn list_records(student_id: &str, conn: &Connection) -> Result<Vec<ReviewRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM review_records
         WHERE student_id = ?1
         ORDER BY concept_id ASC"
    ))?;

    let records = stmt
        .query_map(params![student_id], record_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Review history of one concept, oldest first
pub fn get_review_log(
    student_id: &str,
    concept_id: &str,
    conn: &Connection,
) -> Result<Vec<ReviewLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, concept_id, quality, reviewed_at, interval_days, ease_factor
         FROM review_log
         WHERE student_id = ?1 AND concept_id = ?2
         ORDER BY id ASC",
    )?;

    let entries = stmt
        .query_map(params![student_id, concept_id], |row| {
            let quality = ReviewQuality::try_from(row.get::<_, i64>(2)?).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e))
            })?;
            Ok(ReviewLogEntry {
                student_id: row.get(0)?,
                concept_id: row.get(1)?,
                quality,
                reviewed_at: from_timestamp(3, row.get(3)?)?,
                interval_days: row.get(4)?,
                ease_factor: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}

/// Counts a student's concepts by stage, plus today's review activity
///
/// "Today" is the UTC calendar day of the store's current date.
pub fn get_review_stats(
    student_id: &str,
    subject_id: Option<&str>,
    conn: &Connection,
) -> Result<ReviewStats> {
    let now = get_current_date(conn)?;
    let mut stats = ReviewStats::default();

    for record in list_records(student_id, conn)?
        .iter()
        .filter(|r| subject_id.is_none() || r.subject_id.as_deref() == subject_id)
    {
        stats.total_concepts += 1;
        match (record.last_reviewed_at, record.repetitions) {
            (None, _) => stats.new_concepts += 1,
            (Some(_), 0..=2) => stats.learning_concepts += 1,
            (Some(_), _) => stats.review_concepts += 1,
        }
        if record.is_due(now) {
            stats.due_concepts += 1;
        }
    }

    let day_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .unwrap_or(now);
    let day_end = day_start + TimeDelta::days(1);

    let (reviews_today, correct_today): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN l.quality >= 3 THEN 1 ELSE 0 END), 0)
         FROM review_log l
         JOIN review_records r ON r.student_id = l.student_id AND r.concept_id = l.concept_id
         WHERE l.student_id = ?1
           AND l.reviewed_at >= ?2 AND l.reviewed_at < ?3
           AND (?4 IS NULL OR r.subject_id = ?4)",
        params![student_id, day_start.timestamp(), day_end.timestamp(), subject_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    stats.reviews_today = reviews_today as usize;
    stats.correct_today = correct_today as usize;

    Ok(stats)
}
