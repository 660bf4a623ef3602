//! Student term-mastery repository.
//!
//! # Invariants
//! - One row per `(student_id, course_id, term_key)`; saves are upserts.
//! - Stored scores are finite and within `[0, 1]`.

use super::{ensure_connection_ready, now_epoch_ms, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

/// One student's mastery estimate for one term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMastery {
    pub student_id: String,
    pub course_id: String,
    pub term_key: String,
    pub mastery_score: f64,
    pub confidence_score: f64,
    /// Epoch ms of the last save.
    pub updated_at: i64,
}

/// Term key -> mastery score for one student.
pub type MasteryVector = BTreeMap<String, f64>;

/// Student id -> mastery vector for one course, ordered by student id.
pub type CourseMastery = BTreeMap<String, MasteryVector>;

pub trait KnowledgeRepository {
    /// Inserts or overwrites one mastery row. Scores are clamped to `[0, 1]`.
    fn save_mastery(
        &self,
        student_id: &str,
        course_id: &str,
        term_key: &str,
        mastery_score: f64,
        confidence_score: f64,
    ) -> RepoResult<()>;
    /// Mastery rows of one student, ordered by term key.
    fn list_student_mastery(&self, student_id: &str, course_id: &str)
        -> RepoResult<Vec<TermMastery>>;
    fn load_student_mastery(&self, student_id: &str, course_id: &str) -> RepoResult<MasteryVector>;
    /// Mastery vectors of every student with rows in the course.
    fn load_course_mastery(&self, course_id: &str) -> RepoResult<CourseMastery>;
    fn count_students(&self, course_id: &str) -> RepoResult<usize>;
}

/// SQLite-backed mastery repository.
pub struct SqliteKnowledgeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKnowledgeRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["student_knowledge"])?;
        Ok(Self { conn })
    }
}

impl KnowledgeRepository for SqliteKnowledgeRepository<'_> {
    fn save_mastery(
        &self,
        student_id: &str,
        course_id: &str,
        term_key: &str,
        mastery_score: f64,
        confidence_score: f64,
    ) -> RepoResult<()> {
        let mastery_score = clamp_unit(mastery_score, "mastery_score")?;
        let confidence_score = clamp_unit(confidence_score, "confidence_score")?;
        self.conn.execute(
            "INSERT INTO student_knowledge (
                student_id,
                course_id,
                term_key,
                mastery_score,
                confidence_score,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (student_id, course_id, term_key) DO UPDATE SET
                mastery_score = excluded.mastery_score,
                confidence_score = excluded.confidence_score,
                updated_at = excluded.updated_at;",
            params![
                student_id,
                course_id,
                term_key,
                mastery_score,
                confidence_score,
                now_epoch_ms()
            ],
        )?;
        Ok(())
    }

    fn list_student_mastery(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> RepoResult<Vec<TermMastery>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                student_id,
                course_id,
                term_key,
                mastery_score,
                confidence_score,
                updated_at
             FROM student_knowledge
             WHERE student_id = ?1 AND course_id = ?2
             ORDER BY term_key ASC;",
        )?;
        let mut rows = stmt.query(params![student_id, course_id])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_mastery_row(row)?);
        }
        Ok(items)
    }

    fn load_student_mastery(&self, student_id: &str, course_id: &str) -> RepoResult<MasteryVector> {
        Ok(self
            .list_student_mastery(student_id, course_id)?
            .into_iter()
            .map(|row| (row.term_key, row.mastery_score))
            .collect())
    }

    fn load_course_mastery(&self, course_id: &str) -> RepoResult<CourseMastery> {
        let mut stmt = self.conn.prepare(
            "SELECT student_id, term_key, mastery_score
             FROM student_knowledge
             WHERE course_id = ?1;",
        )?;
        let mut rows = stmt.query([course_id])?;

        let mut vectors = CourseMastery::new();
        while let Some(row) = rows.next()? {
            let student_id: String = row.get(0)?;
            let term_key: String = row.get(1)?;
            let score: f64 = row.get(2)?;
            vectors.entry(student_id).or_default().insert(term_key, score);
        }
        Ok(vectors)
    }

    fn count_students(&self, course_id: &str) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT student_id)
             FROM student_knowledge
             WHERE course_id = ?1;",
            [course_id],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative student count: {count}")))
    }
}

fn clamp_unit(value: f64, field: &str) -> RepoResult<f64> {
    if !value.is_finite() {
        return Err(RepoError::InvalidInput(format!("{field} must be finite")));
    }
    Ok(value.clamp(0.0, 1.0))
}

fn parse_mastery_row(row: &Row<'_>) -> RepoResult<TermMastery> {
    Ok(TermMastery {
        student_id: row.get(0)?,
        course_id: row.get(1)?,
        term_key: row.get(2)?,
        mastery_score: row.get(3)?,
        confidence_score: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
