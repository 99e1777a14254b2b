//! Database query implementations.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use crate::models::{SleepNight, SleepQuality};

/// Stored in `quality_rating` for nights that have not been rated.
const UNRATED: i32 = -1;

/// Parse a stored RFC 3339 timestamp.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("Invalid timestamp: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

const fn quality_to_column(quality: Option<SleepQuality>) -> i32 {
    match quality {
        Some(q) => q.score(),
        None => UNRATED,
    }
}

/// Queries for the nights table.
pub struct NightQueries;

impl NightQueries {
    /// Insert a new night (id is auto-generated).
    pub fn insert(conn: &Connection, night: &SleepNight) -> Result<i64> {
        conn.execute(
            r"INSERT INTO daily_sleep_quality_table (start_time, end_time, quality_rating)
              VALUES (?1, ?2, ?3)",
            params![
                format_timestamp(&night.start_time),
                format_timestamp(&night.end_time),
                quality_to_column(night.quality),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update an existing night, returning the number of rows changed.
    pub fn update(conn: &Connection, night: &SleepNight) -> Result<usize> {
        let count = conn.execute(
            r"UPDATE daily_sleep_quality_table
              SET start_time = ?1, end_time = ?2, quality_rating = ?3
              WHERE night_id = ?4",
            params![
                format_timestamp(&night.start_time),
                format_timestamp(&night.end_time),
                quality_to_column(night.quality),
                night.night_id,
            ],
        )?;
        Ok(count)
    }

    /// Get a night by ID.
    pub fn get_by_id(conn: &Connection, night_id: i64) -> Result<Option<SleepNight>> {
        let mut stmt = conn.prepare(
            r"SELECT night_id, start_time, end_time, quality_rating
              FROM daily_sleep_quality_table WHERE night_id = ?1",
        )?;

        let result = stmt.query_row(params![night_id], |row| Ok(Self::row_to_night(row)));

        match result {
            Ok(night) => Ok(Some(night?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the most recently inserted night.
    pub fn get_latest(conn: &Connection) -> Result<Option<SleepNight>> {
        let mut stmt = conn.prepare(
            r"SELECT night_id, start_time, end_time, quality_rating
              FROM daily_sleep_quality_table ORDER BY night_id DESC LIMIT 1",
        )?;

        let result = stmt.query_row([], |row| Ok(Self::row_to_night(row)));

        match result {
            Ok(night) => Ok(Some(night?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List all nights, newest first.
    pub fn list(conn: &Connection) -> Result<Vec<SleepNight>> {
        let mut stmt = conn.prepare(
            r"SELECT night_id, start_time, end_time, quality_rating
              FROM daily_sleep_quality_table ORDER BY night_id DESC",
        )?;
        let rows = stmt.query_map([], |row| Ok(Self::row_to_night(row)))?;

        let mut nights = Vec::new();
        for row in rows {
            nights.push(row??);
        }
        Ok(nights)
    }

    /// Delete every night.
    pub fn clear(conn: &Connection) -> Result<usize> {
        let count = conn.execute("DELETE FROM daily_sleep_quality_table", [])?;
        Ok(count)
    }

    /// Convert a row to a `SleepNight`.
    fn row_to_night(row: &rusqlite::Row<'_>) -> Result<SleepNight> {
        let start_str: String = row.get(1)?;
        let start_time = parse_timestamp(&start_str)?;

        let end_str: String = row.get(2)?;
        let end_time = parse_timestamp(&end_str)?;

        let score: i32 = row.get(3)?;
        let quality = if score == UNRATED {
            None
        } else {
            Some(
                SleepQuality::from_score(score)
                    .context(format!("Invalid quality rating: {score}"))?,
            )
        };

        Ok(SleepNight {
            night_id: row.get(0)?,
            start_time,
            end_time,
            quality,
        })
    }
}
