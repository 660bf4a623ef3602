//! Canonical text rendering of a parsed document.
//!
//! Records are emitted in source-line order so a rendered document re-parses
//! into the same records in the same order. Chapter `uses` lists are not
//! written: they are derived from the body on every parse.

use crate::parser::document::{
    AnswerKeyDoc, ChapterDoc, DefinitionDoc, ParsedDocument, QuestionDoc, TermDoc,
};

enum Record<'a> {
    Chapter(&'a ChapterDoc),
    Term(&'a TermDoc),
    Definition(&'a DefinitionDoc),
    Question(&'a QuestionDoc),
    Key(&'a AnswerKeyDoc),
}

/// Renders a document in the marker format.
pub fn render_document(document: &ParsedDocument) -> String {
    let mut out = String::new();

    let mut meta = Vec::new();
    if let Some(version) = &document.version {
        meta.push(("version", version.as_str()));
    }
    if let Some(course_id) = &document.course_id {
        meta.push(("course", course_id.as_str()));
    }
    if let Some(title) = &document.title {
        meta.push(("title", title.as_str()));
    }
    push_marker(&mut out, "meta", &meta, "");

    let mut records: Vec<(usize, Record<'_>)> = Vec::new();
    records.extend(document.chapters.iter().map(|c| (c.line, Record::Chapter(c))));
    records.extend(document.terms.iter().map(|t| (t.line, Record::Term(t))));
    records.extend(document.definitions.iter().map(|d| (d.line, Record::Definition(d))));
    records.extend(document.questions.iter().map(|q| (q.line, Record::Question(q))));
    records.extend(document.keys.iter().map(|k| (k.line, Record::Key(k))));
    // stable: equal lines keep per-kind order
    records.sort_by_key(|(line, _)| *line);

    for (_, record) in records {
        match record {
            Record::Chapter(chapter) => {
                let difficulty = chapter.difficulty.map(|value| value.to_string());
                let requires = chapter.requires.join(",");
                let introduces = chapter.introduces.join(",");
                let mut attrs = vec![("id", chapter.id.as_str()), ("title", chapter.title.as_str())];
                if let Some(difficulty) = difficulty.as_deref() {
                    attrs.push(("difficulty", difficulty));
                }
                if !requires.is_empty() {
                    attrs.push(("requires", requires.as_str()));
                }
                if !introduces.is_empty() {
                    attrs.push(("introduces", introduces.as_str()));
                }
                push_marker(&mut out, "chapter", &attrs, &chapter.content);
            }
            Record::Term(term) => push_marker(&mut out, "term", &[("key", term.key.as_str())], ""),
            Record::Definition(definition) => push_marker(
                &mut out,
                "definition",
                &[("term", definition.term_key.as_str())],
                &definition.text,
            ),
            Record::Question(question) => push_marker(
                &mut out,
                "question",
                &[
                    ("id", question.id.as_str()),
                    ("chapter", question.chapter_id.as_str()),
                    ("type", question.kind.as_str()),
                ],
                &question.prompt,
            ),
            Record::Key(key) => push_marker(
                &mut out,
                "key",
                &[("question", key.question_id.as_str())],
                &key.value,
            ),
        }
    }

    out
}

fn push_marker(out: &mut String, marker: &str, attrs: &[(&str, &str)], body: &str) {
    out.push('@');
    out.push_str(marker);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    out.push('\n');
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}
