//! Timestamp file repository.

use chrono::{DateTime, Utc};
use reelguard_core::TimestampFile;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::StoredTitle;

/// Repository for timestamp files keyed by IMDb id.
pub struct TimestampsRepo;

impl TimestampsRepo {
    /// Insert or replace the file for `file.imdb_id`.
    pub fn upsert(conn: &Connection, file: &TimestampFile) -> Result<()> {
        let data = serde_json::to_string(file)?;

        conn.execute(
            "INSERT INTO timestamps (imdb_id, title, data, segment_count)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(imdb_id) DO UPDATE SET
                title = ?2,
                data = ?3,
                segment_count = ?4,
                updated_at = datetime('now')",
            params![
                file.imdb_id,
                file.title,
                data,
                file.timestamps.len() as i64
            ],
        )?;

        Ok(())
    }

    /// Get the file for an IMDb id.
    pub fn get(conn: &Connection, imdb_id: &str) -> Result<Option<TimestampFile>> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM timestamps WHERE imdb_id = ?1",
                [imdb_id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Delete the file for an IMDb id.
    pub fn delete(conn: &Connection, imdb_id: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM timestamps WHERE imdb_id = ?1", [imdb_id])?;
        Ok(deleted > 0)
    }

    /// List stored titles ordered by title.
    pub fn list(conn: &Connection) -> Result<Vec<StoredTitle>> {
        let mut stmt = conn.prepare(
            "SELECT imdb_id, title, segment_count, updated_at
             FROM timestamps ORDER BY title COLLATE NOCASE, imdb_id",
        )?;

        let titles = stmt
            .query_map([], |row| {
                Ok(StoredTitle {
                    imdb_id: row.get(0)?,
                    title: row.get(1)?,
                    segment_count: row.get(2)?,
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(titles)
    }

    /// Count stored titles.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM timestamps", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
