//! Uniform diagnostic record shared by every import stage.
//!
//! # Responsibility
//! - Give parser, cross-reference and graph findings one shape so batches
//!   from different stages can be concatenated and rendered together.
//!
//! # Invariants
//! - Diagnostics are data: stages accumulate them and never abort early.
//! - `IssueCode::as_str()` is the stable external code string.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Closed set of issue codes produced by the import pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // parser
    MissingMeta,
    MissingField,
    InvalidField,
    InvalidAttrSyntax,
    InvalidEscape,
    UnknownMarker,
    InvalidQuestionType,
    // cross-reference
    DuplicateTerm,
    DuplicateChapter,
    DuplicateQuestion,
    TermNotFound,
    MissingDefinition,
    ChapterNotFound,
    QuestionNotFound,
    // graph
    ChapterRefNotFound,
    TermRefNotFound,
    CycleDetected,
    OrphanChapter,
    OrphanTerm,
}

impl IssueCode {
    /// Returns the external SCREAMING_SNAKE code string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingMeta => "MISSING_META",
            Self::MissingField => "MISSING_FIELD",
            Self::InvalidField => "INVALID_FIELD",
            Self::InvalidAttrSyntax => "INVALID_ATTR_SYNTAX",
            Self::InvalidEscape => "INVALID_ESCAPE",
            Self::UnknownMarker => "UNKNOWN_MARKER",
            Self::InvalidQuestionType => "INVALID_QUESTION_TYPE",
            Self::DuplicateTerm => "DUPLICATE_TERM",
            Self::DuplicateChapter => "DUPLICATE_CHAPTER",
            Self::DuplicateQuestion => "DUPLICATE_QUESTION",
            Self::TermNotFound => "TERM_NOT_FOUND",
            Self::MissingDefinition => "MISSING_DEFINITION",
            Self::ChapterNotFound => "CHAPTER_NOT_FOUND",
            Self::QuestionNotFound => "QUESTION_NOT_FOUND",
            Self::ChapterRefNotFound => "CHAPTER_REF_NOT_FOUND",
            Self::TermRefNotFound => "TERM_REF_NOT_FOUND",
            Self::CycleDetected => "CYCLE_DETECTED",
            Self::OrphanChapter => "ORPHAN_CHAPTER",
            Self::OrphanTerm => "ORPHAN_TERM",
        }
    }
}

impl Display for IssueCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a diagnostic points: a 1-based source line or a graph node/edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Line(usize),
    Node(String),
}

/// One finding from any import stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: IssueCode,
    pub message: String,
    pub location: Location,
    /// Marker name (`chapter`, `term`, ...) or graph category (`requires`, `cycle`, ...).
    pub block: String,
    /// Id/key of the record the finding is about, when one is known.
    pub subject_id: Option<String>,
}

impl Diagnostic {
    /// Creates a line-anchored diagnostic.
    pub fn at_line(
        code: IssueCode,
        message: impl Into<String>,
        line: usize,
        block: impl Into<String>,
        subject_id: Option<&str>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            location: Location::Line(line),
            block: block.into(),
            subject_id: subject_id.map(str::to_string),
        }
    }

    /// Creates a node-anchored diagnostic.
    pub fn at_node(
        code: IssueCode,
        message: impl Into<String>,
        node: impl Into<String>,
        block: impl Into<String>,
    ) -> Self {
        let node = node.into();
        Self {
            code,
            message: message.into(),
            subject_id: Some(node.clone()),
            location: Location::Node(node),
            block: block.into(),
        }
    }

    /// Returns the source line for line-anchored diagnostics.
    pub fn line(&self) -> Option<usize> {
        match self.location {
            Location::Line(line) => Some(line),
            Location::Node(_) => None,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Location::Line(line) => write!(f, "{} line {}: {}", self.code, line, self.message),
            Location::Node(node) => write!(f, "{} node {}: {}", self.code, node, self.message),
        }
    }
}
