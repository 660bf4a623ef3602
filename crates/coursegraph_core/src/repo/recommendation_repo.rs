//! Append-only recommendation log.
//!
//! # Invariants
//! - Entries are never updated or deleted.
//! - Factor lists are stored through one versioned encoder (`factors_encoding`).

use super::{ensure_connection_ready, RepoError, RepoResult};
use crate::model::recommendation::{
    decode_factors, encode_factors, RecommendationLogEntry, FACTOR_ENCODING_KV1,
};
use rusqlite::{params, Connection, Row};

pub trait RecommendationLogRepository {
    fn append_log(&self, entry: &RecommendationLogEntry) -> RepoResult<()>;
    /// Entries for one student and course, newest first.
    fn list_logs(&self, student_id: &str, course_id: &str)
        -> RepoResult<Vec<RecommendationLogEntry>>;
}

pub struct SqliteRecommendationLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecommendationLogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["recommendation_log"])?;
        Ok(Self { conn })
    }
}

impl RecommendationLogRepository for SqliteRecommendationLogRepository<'_> {
    fn append_log(&self, entry: &RecommendationLogEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO recommendation_log (
                log_id,
                student_id,
                course_id,
                chapter_id,
                score,
                reason,
                factors,
                factors_encoding,
                recommender_version,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                entry.log_id,
                entry.student_id,
                entry.course_id,
                entry.chapter_id,
                entry.score,
                entry.reason,
                encode_factors(&entry.factors),
                FACTOR_ENCODING_KV1,
                entry.recommender_version,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_logs(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> RepoResult<Vec<RecommendationLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                log_id,
                student_id,
                course_id,
                chapter_id,
                score,
                reason,
                factors,
                factors_encoding,
                recommender_version,
                created_at
             FROM recommendation_log
             WHERE student_id = ?1 AND course_id = ?2
             ORDER BY created_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query(params![student_id, course_id])?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_log_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_log_row(row: &Row<'_>) -> RepoResult<RecommendationLogEntry> {
    let log_id: String = row.get(0)?;
    let encoded: String = row.get(6)?;
    let encoding: String = row.get(7)?;
    if encoding != FACTOR_ENCODING_KV1 {
        return Err(RepoError::InvalidData(format!(
            "recommendation log {log_id} uses unknown factor encoding `{encoding}`"
        )));
    }
    let factors = decode_factors(&encoded)
        .map_err(|err| RepoError::InvalidData(format!("recommendation log {log_id}: {err}")))?;

    Ok(RecommendationLogEntry {
        log_id,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        chapter_id: row.get(3)?,
        score: row.get(4)?,
        reason: row.get(5)?,
        factors,
        recommender_version: row.get(8)?,
        created_at: row.get(9)?,
    })
}
