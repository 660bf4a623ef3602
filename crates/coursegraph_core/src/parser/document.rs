//! Intermediate document produced by the parser.
//!
//! # Invariants
//! - Every record carries the 1-based line of its opening marker.
//! - The document may be invalid; validity is decided by the error batches.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDoc {
    pub id: String,
    pub title: String,
    pub difficulty: Option<i32>,
    pub content: String,
    /// From the `requires` CSV attribute.
    pub requires: Vec<String>,
    /// From the `introduces` CSV attribute.
    pub introduces: Vec<String>,
    /// Derived from `@token` references in the body.
    pub uses: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDoc {
    pub key: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionDoc {
    pub term_key: String,
    pub text: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDoc {
    pub id: String,
    pub chapter_id: String,
    /// Raw type attribute; may be unsupported when an error was reported.
    pub kind: String,
    pub prompt: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyDoc {
    pub question_id: String,
    pub value: String,
    pub line: usize,
}

/// Parsed course document. Rebuilt on every import call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub version: Option<String>,
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub chapters: Vec<ChapterDoc>,
    pub terms: Vec<TermDoc>,
    pub definitions: Vec<DefinitionDoc>,
    pub questions: Vec<QuestionDoc>,
    pub keys: Vec<AnswerKeyDoc>,
}
