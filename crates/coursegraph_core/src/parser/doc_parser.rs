//! Line-oriented parser for the course marker format.
//!
//! # Responsibility
//! - Turn raw text into a `ParsedDocument` plus every parse error found.
//!
//! # Invariants
//! - Parsing never aborts: each defect is recorded and scanning continues.
//! - The last open marker is always flushed at end of input.
//! - Comment lines (`#` after trim) are ignored everywhere.

use crate::model::diagnostic::{Diagnostic, IssueCode};
use crate::parser::document::{
    AnswerKeyDoc, ChapterDoc, DefinitionDoc, ParsedDocument, QuestionDoc, TermDoc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("\r\n|[\n\u{0B}\u{0C}\r\u{85}\u{2028}\u{2029}]").expect("valid line break regex")
});
static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@([a-z][a-z0-9_]*)\s*(.*)$").expect("valid marker regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-z][a-z0-9_]*)="((?:\\.|[^"\\])*)""#).expect("valid attribute regex")
});
static TERM_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([a-zA-Z0-9_-]+)").expect("valid term reference regex"));

const QUESTION_TYPES: &[&str] = &["single", "multi", "text"];

/// Parser output: a possibly-invalid document and its error batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub document: ParsedDocument,
    pub errors: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

struct PendingBlock {
    marker: String,
    attrs: HashMap<String, String>,
    line: usize,
    body: Vec<String>,
}

#[derive(Default)]
struct ParseState {
    document: ParsedDocument,
    errors: Vec<Diagnostic>,
}

/// Parses one course document. Never fails; defects land in `errors`.
pub fn parse_document(content: &str) -> ParseOutcome {
    let mut state = ParseState::default();
    let mut pending: Option<PendingBlock> = None;

    for (index, line) in LINE_BREAK_RE.split(content).enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }

        if let Some(caps) = MARKER_RE.captures(trimmed) {
            if let Some(block) = pending.take() {
                state.flush(block);
            }

            let marker = caps[1].to_string();
            let attrs = parse_attrs(&caps[2], line_no, &marker, &mut state.errors);
            if marker == "meta" {
                state.apply_meta(&attrs, line_no);
                continue;
            }

            pending = Some(PendingBlock {
                marker,
                attrs,
                line: line_no,
                body: Vec::new(),
            });
        } else if let Some(block) = pending.as_mut() {
            if !trimmed.is_empty() {
                block.body.push(line.to_string());
            }
        }
    }

    if let Some(block) = pending.take() {
        state.flush(block);
    }

    if state.document.version.is_none() || state.document.course_id.is_none() {
        state.errors.push(Diagnostic::at_line(
            IssueCode::MissingMeta,
            "document must contain @meta with version and course",
            1,
            "meta",
            Some("meta"),
        ));
    }

    ParseOutcome {
        document: state.document,
        errors: state.errors,
    }
}

/// Term keys referenced as `@token` in a chapter body, first-seen order, deduplicated.
pub fn referenced_terms(body: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    TERM_REF_RE
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

impl ParseState {
    fn apply_meta(&mut self, attrs: &HashMap<String, String>, line: usize) {
        self.document.version = attrs.get("version").cloned();
        self.document.course_id = attrs.get("course").cloned();
        self.document.title = attrs.get("title").cloned();

        if self.document.version.is_none() {
            self.missing_field("@meta.version required", line, "meta", Some("meta"));
        }
        if self.document.course_id.is_none() {
            self.missing_field("@meta.course required", line, "meta", Some("meta"));
        }
    }

    fn flush(&mut self, block: PendingBlock) {
        let body = block.body.join("\n").trim().to_string();
        let attrs = &block.attrs;
        let line = block.line;

        match block.marker.as_str() {
            "chapter" => {
                let id = attrs.get("id");
                let difficulty = match attrs.get("difficulty") {
                    Some(raw) => match raw.parse::<i32>() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            self.errors.push(Diagnostic::at_line(
                                IssueCode::InvalidField,
                                format!("@chapter difficulty must be integer, got `{raw}`"),
                                line,
                                "chapter",
                                id.map(String::as_str),
                            ));
                            None
                        }
                    },
                    None => None,
                };

                let (Some(id), Some(title)) = (id, attrs.get("title")) else {
                    self.missing_field(
                        "@chapter id/title required",
                        line,
                        "chapter",
                        id.map(String::as_str),
                    );
                    return;
                };

                self.document.chapters.push(ChapterDoc {
                    id: id.clone(),
                    title: title.clone(),
                    difficulty,
                    requires: csv(attrs.get("requires")),
                    introduces: csv(attrs.get("introduces")),
                    uses: referenced_terms(&body),
                    content: body,
                    line,
                });
            }
            "term" => match attrs.get("key") {
                Some(key) => self.document.terms.push(TermDoc {
                    key: key.clone(),
                    line,
                }),
                None => self.missing_field("@term key required", line, "term", None),
            },
            "definition" => match attrs.get("term") {
                Some(term_key) => self.document.definitions.push(DefinitionDoc {
                    term_key: term_key.clone(),
                    text: body,
                    line,
                }),
                None => self.missing_field("@definition term required", line, "definition", None),
            },
            "question" => {
                let id = attrs.get("id");
                let (Some(id), Some(chapter_id), Some(kind)) =
                    (id, attrs.get("chapter"), attrs.get("type"))
                else {
                    self.missing_field(
                        "@question id/chapter/type required",
                        line,
                        "question",
                        id.map(String::as_str),
                    );
                    return;
                };

                if !QUESTION_TYPES.contains(&kind.as_str()) {
                    self.errors.push(Diagnostic::at_line(
                        IssueCode::InvalidQuestionType,
                        format!("unsupported question type `{kind}`"),
                        line,
                        "question",
                        Some(id),
                    ));
                }
                self.document.questions.push(QuestionDoc {
                    id: id.clone(),
                    chapter_id: chapter_id.clone(),
                    kind: kind.clone(),
                    prompt: body,
                    line,
                });
            }
            "key" => match attrs.get("question") {
                Some(question_id) => self.document.keys.push(AnswerKeyDoc {
                    question_id: question_id.clone(),
                    value: body,
                    line,
                }),
                None => self.missing_field("@key question required", line, "key", None),
            },
            other => self.errors.push(Diagnostic::at_line(
                IssueCode::UnknownMarker,
                format!("unsupported marker @{other}"),
                line,
                other,
                Some(other),
            )),
        }
    }

    fn missing_field(&mut self, message: &str, line: usize, block: &str, subject: Option<&str>) {
        self.errors.push(Diagnostic::at_line(
            IssueCode::MissingField,
            message,
            line,
            block,
            subject,
        ));
    }
}

fn parse_attrs(
    raw: &str,
    line: usize,
    marker: &str,
    errors: &mut Vec<Diagnostic>,
) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for caps in ATTR_RE.captures_iter(raw) {
        let value = unescape(&caps[2], line, marker, errors);
        attrs.insert(caps[1].to_string(), value);
    }

    let residue = ATTR_RE.replace_all(raw, "");
    let residue = residue.trim();
    if !residue.is_empty() {
        errors.push(Diagnostic::at_line(
            IssueCode::InvalidAttrSyntax,
            format!("cannot parse attributes: {residue}"),
            line,
            marker,
            Some(marker),
        ));
    }
    attrs
}

/// Resolves `\"`, `\\`, `\n`, `\t` and `\@`. Unknown escapes keep the literal character.
fn unescape(raw: &str, line: usize, marker: &str, errors: &mut Vec<Diagnostic>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(next) = chars.next() else {
            errors.push(Diagnostic::at_line(
                IssueCode::InvalidEscape,
                "dangling escape",
                line,
                marker,
                Some(marker),
            ));
            break;
        };
        match next {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '@' => out.push('@'),
            other => {
                errors.push(Diagnostic::at_line(
                    IssueCode::InvalidEscape,
                    format!("unknown escape: \\{other}"),
                    line,
                    marker,
                    Some(marker),
                ));
                out.push(other);
            }
        }
    }
    out
}

fn csv(value: Option<&String>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(*item))
        .map(str::to_string)
        .collect()
}
