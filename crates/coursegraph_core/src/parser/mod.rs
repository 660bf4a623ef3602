//! Course document parsing and rendering.
//!
//! # Responsibility
//! - Scan the `@marker attr="value"` line format into a `ParsedDocument`.
//! - Render a `ParsedDocument` back into the same format.
//!
//! # Invariants
//! - The parser accumulates errors and never panics or returns early.

pub mod doc_parser;
pub mod document;
pub mod writer;

pub use doc_parser::{parse_document, referenced_terms, ParseOutcome};
pub use document::{
    AnswerKeyDoc, ChapterDoc, DefinitionDoc, ParsedDocument, QuestionDoc, TermDoc,
};
pub use writer::render_document;
