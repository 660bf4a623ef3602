//! Cross-reference checks over a parsed document.
//!
//! # Invariants
//! - Pure: reads the document, returns one diagnostic per offending record.
//! - Every row sharing a duplicated id is flagged, not only the later ones.
//! - Answer keys and questions are optional per question/chapter.

use crate::model::diagnostic::{Diagnostic, IssueCode};
use crate::parser::document::ParsedDocument;
use std::collections::{HashMap, HashSet};

struct Row<'a> {
    id: &'a str,
    line: usize,
}

/// Validates id uniqueness and inter-section references.
pub fn validate_references(document: &ParsedDocument) -> Vec<Diagnostic> {
    let mut issues = Vec::new();

    flag_duplicates(
        document.terms.iter().map(|t| Row { id: &t.key, line: t.line }),
        IssueCode::DuplicateTerm,
        "term",
        &mut issues,
    );
    flag_duplicates(
        document.chapters.iter().map(|c| Row { id: &c.id, line: c.line }),
        IssueCode::DuplicateChapter,
        "chapter",
        &mut issues,
    );
    flag_duplicates(
        document.questions.iter().map(|q| Row { id: &q.id, line: q.line }),
        IssueCode::DuplicateQuestion,
        "question",
        &mut issues,
    );

    let term_keys: HashSet<&str> = document.terms.iter().map(|t| t.key.as_str()).collect();
    for definition in &document.definitions {
        if !term_keys.contains(definition.term_key.as_str()) {
            issues.push(Diagnostic::at_line(
                IssueCode::TermNotFound,
                format!("definition references unknown term: {}", definition.term_key),
                definition.line,
                "definition",
                Some(&definition.term_key),
            ));
        }
    }

    let defined: HashSet<&str> = document
        .definitions
        .iter()
        .map(|d| d.term_key.as_str())
        .collect();
    for term in &document.terms {
        if !defined.contains(term.key.as_str()) {
            issues.push(Diagnostic::at_line(
                IssueCode::MissingDefinition,
                format!("term has no definition: {}", term.key),
                term.line,
                "term",
                Some(&term.key),
            ));
        }
    }

    let chapter_ids: HashSet<&str> = document.chapters.iter().map(|c| c.id.as_str()).collect();
    for question in &document.questions {
        if !chapter_ids.contains(question.chapter_id.as_str()) {
            issues.push(Diagnostic::at_line(
                IssueCode::ChapterNotFound,
                format!("question references unknown chapter: {}", question.chapter_id),
                question.line,
                "question",
                Some(&question.id),
            ));
        }
    }

    let question_ids: HashSet<&str> = document.questions.iter().map(|q| q.id.as_str()).collect();
    for key in &document.keys {
        if !question_ids.contains(key.question_id.as_str()) {
            issues.push(Diagnostic::at_line(
                IssueCode::QuestionNotFound,
                format!("key references unknown question: {}", key.question_id),
                key.line,
                "key",
                Some(&key.question_id),
            ));
        }
    }

    issues
}

fn flag_duplicates<'a>(
    rows: impl Iterator<Item = Row<'a>>,
    code: IssueCode,
    block: &str,
    issues: &mut Vec<Diagnostic>,
) {
    let rows: Vec<Row<'a>> = rows.collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in &rows {
        *counts.entry(row.id).or_default() += 1;
    }

    for row in rows {
        if counts.get(row.id).copied().unwrap_or(0) > 1 {
            issues.push(Diagnostic::at_line(
                code,
                format!("duplicate {block} id/key: {}", row.id),
                row.line,
                block,
                Some(row.id),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validate_references;
    use crate::model::diagnostic::IssueCode;
    use crate::parser::doc_parser::parse_document;

    fn issue_codes(source: &str) -> Vec<IssueCode> {
        let outcome = parse_document(source);
        validate_references(&outcome.document)
            .into_iter()
            .map(|issue| issue.code)
            .collect()
    }

    #[test]
    fn clean_document_has_no_issues() {
        let codes = issue_codes(
            "@meta version=\"1\" course=\"c\"\n\
             @term key=\"a\"\n@definition term=\"a\"\nA\n\
             @chapter id=\"ch\" title=\"t\"\n\
             @question id=\"q\" chapter=\"ch\" type=\"text\"\nWhy?\n",
        );
        assert!(codes.is_empty());
    }

    #[test]
    fn every_duplicate_row_is_flagged() {
        let outcome = parse_document(
            "@meta version=\"1\" course=\"c\"\n\
             @chapter id=\"ch\" title=\"one\"\n\
             @chapter id=\"ch\" title=\"two\"\n\
             @chapter id=\"ch\" title=\"three\"\n",
        );
        let issues = validate_references(&outcome.document);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.code == IssueCode::DuplicateChapter));
        let lines: Vec<_> = issues.iter().filter_map(|i| i.line()).collect();
        assert_eq!(lines, vec![2, 3, 4]);
    }

    #[test]
    fn dangling_references_are_reported_per_record() {
        let codes = issue_codes(
            "@meta version=\"1\" course=\"c\"\n\
             @term key=\"a\"\n\
             @definition term=\"ghost\"\nBoo\n\
             @question id=\"q\" chapter=\"missing\" type=\"single\"\n\
             @key question=\"nope\"\nA\n",
        );
        assert_eq!(
            codes,
            vec![
                IssueCode::TermNotFound,
                IssueCode::MissingDefinition,
                IssueCode::ChapterNotFound,
                IssueCode::QuestionNotFound,
            ]
        );
    }
}
