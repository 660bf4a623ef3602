//! Mapping from a validated `ParsedDocument` to the `Course` aggregate.
//!
//! # Invariants
//! - First definition per term and first answer key per question win.
//! - A question without an answer key maps to `answer_value = None`.

use crate::graph::builder::ChapterRelations;
use crate::model::course::{Chapter, Course, Question, QuestionType, Term};
use crate::parser::document::ParsedDocument;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Document shape the mapper cannot turn into a course.
///
/// Unreachable for documents whose parse and cross-reference batches are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    MissingMeta(&'static str),
    InvalidQuestionType { question_id: String, value: String },
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingMeta(field) => write!(f, "document has no @meta {field}"),
            Self::InvalidQuestionType { question_id, value } => {
                write!(f, "question {question_id} has unsupported type `{value}`")
            }
        }
    }
}

impl Error for MappingError {}

/// Builds the course aggregate.
pub fn to_course(document: &ParsedDocument) -> Result<Course, MappingError> {
    let id = document
        .course_id
        .clone()
        .ok_or(MappingError::MissingMeta("course"))?;
    let version = document
        .version
        .clone()
        .ok_or(MappingError::MissingMeta("version"))?;

    let mut definitions: HashMap<&str, &str> = HashMap::new();
    for definition in &document.definitions {
        definitions
            .entry(definition.term_key.as_str())
            .or_insert(definition.text.as_str());
    }
    let mut answers: HashMap<&str, &str> = HashMap::new();
    for key in &document.keys {
        answers
            .entry(key.question_id.as_str())
            .or_insert(key.value.as_str());
    }

    let chapters = document
        .chapters
        .iter()
        .map(|chapter| Chapter {
            id: chapter.id.clone(),
            title: chapter.title.clone(),
            difficulty: chapter.difficulty,
            content: chapter.content.clone(),
        })
        .collect();

    let terms = document
        .terms
        .iter()
        .map(|term| Term {
            key: term.key.clone(),
            definition: definitions.get(term.key.as_str()).map(|text| text.to_string()),
        })
        .collect();

    let questions = document
        .questions
        .iter()
        .map(|question| {
            let kind = question.kind.parse::<QuestionType>().map_err(|_| {
                MappingError::InvalidQuestionType {
                    question_id: question.id.clone(),
                    value: question.kind.clone(),
                }
            })?;
            Ok(Question {
                id: question.id.clone(),
                chapter_id: question.chapter_id.clone(),
                kind,
                prompt: question.prompt.clone(),
                answer_value: answers.get(question.id.as_str()).map(|v| v.to_string()),
            })
        })
        .collect::<Result<Vec<_>, MappingError>>()?;

    Ok(Course {
        id,
        version,
        title: document.title.clone(),
        chapters,
        terms,
        questions,
    })
}

/// Collects the per-chapter relation maps the graph builder consumes.
pub fn chapter_relations(document: &ParsedDocument) -> ChapterRelations {
    let mut relations = ChapterRelations::default();
    for chapter in &document.chapters {
        relations
            .requires
            .insert(chapter.id.clone(), chapter.requires.clone());
        relations
            .introduces
            .insert(chapter.id.clone(), chapter.introduces.clone());
        relations.uses.insert(chapter.id.clone(), chapter.uses.clone());
    }
    relations
}
