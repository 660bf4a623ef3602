//! Course aggregate built from a validated document.
//!
//! # Responsibility
//! - Define the immutable domain shape handed to graph building and callers.
//!
//! # Invariants
//! - A `Course` is only built from a document with an empty error batch.
//! - Chapter/term/question order follows declaration order in the source.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Question answer format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Exactly one correct option.
    Single,
    /// Several options may be correct.
    Multi,
    /// Free-text answer.
    Text,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
            Self::Text => "text",
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            "text" => Ok(Self::Text),
            other => Err(format!("unsupported question type `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// `None` when the source omitted it or it was not an integer.
    pub difficulty: Option<i32>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub key: String,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub chapter_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub prompt: String,
    /// Canonical answer; answer keys are optional in the source format.
    pub answer_value: Option<String>,
}

/// Course aggregate. Built once per successful import and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub version: String,
    pub title: Option<String>,
    pub chapters: Vec<Chapter>,
    pub terms: Vec<Term>,
    pub questions: Vec<Question>,
}

impl Course {
    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| chapter.id == chapter_id)
    }

    pub fn term_keys(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.key.as_str())
    }
}
