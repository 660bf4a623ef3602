//! Course graph repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist one course graph as chapter metadata plus two relation tables.
//! - Load relation rows back in the order the graph builder emits edges.
//!
//! # Invariants
//! - `replace_course_graph` is all-or-nothing per course.
//! - Prerequisite rows load as `chapter_id ASC, position ASC`.
//! - Chapter-term rows load as `introduces` before `uses`, then
//!   `chapter_id ASC, position ASC`.

use super::{ensure_connection_ready, RepoError, RepoResult};
use crate::model::course::Chapter;
use crate::model::graph::EdgeType;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;

const GRAPH_TABLES: &[&str] = &["chapter_metadata", "chapter_prerequisites", "chapter_terms"];

/// `chapter_id` requires `prerequisite_chapter_id` to be completed first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisitePair {
    pub chapter_id: String,
    pub prerequisite_chapter_id: String,
}

/// `chapter_id` introduces or uses `term_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterTermPair {
    pub chapter_id: String,
    pub term_key: String,
    /// `Introduces` or `Uses`.
    pub role: EdgeType,
}

/// Storage contract for course graphs.
pub trait GraphRepository {
    /// Overwrites every graph row of `course_id` in one transaction.
    fn replace_course_graph(
        &self,
        course_id: &str,
        chapters: &[Chapter],
        prerequisites: &[PrerequisitePair],
        chapter_terms: &[ChapterTermPair],
    ) -> RepoResult<()>;
    fn load_prerequisite_pairs(&self, course_id: &str) -> RepoResult<Vec<PrerequisitePair>>;
    fn load_chapter_term_pairs(&self, course_id: &str) -> RepoResult<Vec<ChapterTermPair>>;
    /// Declared difficulties of every chapter of the course that has one.
    fn load_chapter_difficulties(&self, course_id: &str) -> RepoResult<HashMap<String, i32>>;
}

/// SQLite-backed course graph repository.
pub struct SqliteGraphRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGraphRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, GRAPH_TABLES)?;
        Ok(Self { conn })
    }
}

impl GraphRepository for SqliteGraphRepository<'_> {
    fn replace_course_graph(
        &self,
        course_id: &str,
        chapters: &[Chapter],
        prerequisites: &[PrerequisitePair],
        chapter_terms: &[ChapterTermPair],
    ) -> RepoResult<()> {
        if let Some(pair) = chapter_terms.iter().find(|pair| !pair.role.targets_term()) {
            return Err(RepoError::InvalidInput(format!(
                "chapter-term pair {}->{} has non-term role `{}`",
                pair.chapter_id,
                pair.term_key,
                pair.role.as_role()
            )));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for table in GRAPH_TABLES {
            tx.execute(
                &format!("DELETE FROM {table} WHERE course_id = ?1;"),
                [course_id],
            )?;
        }

        for chapter in chapters {
            tx.execute(
                "INSERT OR REPLACE INTO chapter_metadata (
                    course_id,
                    chapter_id,
                    title,
                    difficulty
                ) VALUES (?1, ?2, ?3, ?4);",
                params![course_id, chapter.id, chapter.title, chapter.difficulty],
            )?;
        }

        for (position, pair) in prerequisites.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO chapter_prerequisites (
                    course_id,
                    chapter_id,
                    prerequisite_chapter_id,
                    position
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    course_id,
                    pair.chapter_id,
                    pair.prerequisite_chapter_id,
                    position as i64
                ],
            )?;
        }

        for (position, pair) in chapter_terms.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO chapter_terms (
                    course_id,
                    chapter_id,
                    term_key,
                    role,
                    position
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    course_id,
                    pair.chapter_id,
                    pair.term_key,
                    pair.role.as_role(),
                    position as i64
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn load_prerequisite_pairs(&self, course_id: &str) -> RepoResult<Vec<PrerequisitePair>> {
        let mut stmt = self.conn.prepare(
            "SELECT chapter_id, prerequisite_chapter_id
             FROM chapter_prerequisites
             WHERE course_id = ?1
             ORDER BY chapter_id ASC, position ASC;",
        )?;
        let mut rows = stmt.query([course_id])?;

        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            pairs.push(PrerequisitePair {
                chapter_id: row.get(0)?,
                prerequisite_chapter_id: row.get(1)?,
            });
        }
        Ok(pairs)
    }

    fn load_chapter_term_pairs(&self, course_id: &str) -> RepoResult<Vec<ChapterTermPair>> {
        let mut stmt = self.conn.prepare(
            "SELECT chapter_id, term_key, role
             FROM chapter_terms
             WHERE course_id = ?1
             ORDER BY
                CASE role WHEN 'introduces' THEN 0 ELSE 1 END ASC,
                chapter_id ASC,
                position ASC;",
        )?;
        let mut rows = stmt.query([course_id])?;

        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            pairs.push(parse_chapter_term_row(row)?);
        }
        Ok(pairs)
    }

    fn load_chapter_difficulties(&self, course_id: &str) -> RepoResult<HashMap<String, i32>> {
        let mut stmt = self.conn.prepare(
            "SELECT chapter_id, difficulty
             FROM chapter_metadata
             WHERE course_id = ?1 AND difficulty IS NOT NULL;",
        )?;
        let mut rows = stmt.query([course_id])?;

        let mut difficulties = HashMap::new();
        while let Some(row) = rows.next()? {
            difficulties.insert(row.get::<_, String>(0)?, row.get::<_, i32>(1)?);
        }
        Ok(difficulties)
    }
}

fn parse_chapter_term_row(row: &Row<'_>) -> RepoResult<ChapterTermPair> {
    let chapter_id: String = row.get(0)?;
    let term_key: String = row.get(1)?;
    let raw_role: String = row.get(2)?;
    let role = EdgeType::from_role(&raw_role)
        .filter(|role| role.targets_term())
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "chapter_terms row {chapter_id}->{term_key} has unknown role `{raw_role}`"
            ))
        })?;
    Ok(ChapterTermPair {
        chapter_id,
        term_key,
        role,
    })
}
