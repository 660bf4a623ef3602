//! Knowledge graph value types.
//!
//! # Responsibility
//! - Describe the typed chapter/term graph and the query-time student view.
//!
//! # Invariants
//! - `Requires` edges run chapter -> chapter.
//! - `Introduces` and `Uses` edges run chapter -> term.
//! - A `GraphModel` is immutable once built; updates replace it wholesale.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Relation kind of one graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Chapter depends on another chapter being completed.
    Requires,
    /// Chapter teaches a term.
    Introduces,
    /// Chapter depends on a term being mastered.
    Uses,
}

impl EdgeType {
    /// Storage role string for chapter-term rows.
    pub fn as_role(self) -> &'static str {
        match self {
            Self::Requires => "requires",
            Self::Introduces => "introduces",
            Self::Uses => "uses",
        }
    }

    pub fn from_role(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "requires" => Some(Self::Requires),
            "introduces" => Some(Self::Introduces),
            "uses" => Some(Self::Uses),
            _ => None,
        }
    }

    pub fn targets_term(self) -> bool {
        !matches!(self, Self::Requires)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: EdgeType,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: EdgeType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }
}

/// One course's knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphModel {
    pub course_id: String,
    pub chapter_nodes: BTreeSet<String>,
    pub term_nodes: BTreeSet<String>,
    pub edges: Vec<GraphEdge>,
}

impl GraphModel {
    /// Direct targets of `chapter_id` along edges of `kind`, deduplicated and sorted.
    pub fn targets(&self, chapter_id: &str, kind: EdgeType) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|edge| edge.kind == kind && edge.from == chapter_id)
            .map(|edge| edge.to.as_str())
            .collect()
    }

    /// Introduced term keys of one chapter, deduplicated and sorted.
    ///
    /// Scores summed over this list do not depend on declaration order.
    pub fn introduced_terms(&self, chapter_id: &str) -> Vec<&str> {
        self.targets(chapter_id, EdgeType::Introduces)
            .into_iter()
            .collect()
    }

    pub fn edges_of(&self, kind: EdgeType) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }

    pub fn has_chapter(&self, chapter_id: &str) -> bool {
        self.chapter_nodes.contains(chapter_id)
    }
}

/// Query-time view of one student. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentProfile {
    pub completed_chapters: BTreeSet<String>,
    pub mastered_terms: BTreeSet<String>,
}

impl StudentProfile {
    pub fn new<C, T>(completed_chapters: C, mastered_terms: T) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            completed_chapters: completed_chapters.into_iter().map(Into::into).collect(),
            mastered_terms: mastered_terms.into_iter().map(Into::into).collect(),
        }
    }
}

/// Eligibility verdict for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub chapter_id: String,
    pub eligible: bool,
    /// Lexicographically sorted.
    pub missing_chapters: Vec<String>,
    /// Lexicographically sorted.
    pub missing_terms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{EdgeType, GraphEdge, GraphModel};

    #[test]
    fn introduced_terms_ignore_declaration_order() {
        let graph = GraphModel {
            course_id: "c".to_string(),
            chapter_nodes: ["alpha", "beta"].iter().map(|c| c.to_string()).collect(),
            term_nodes: ["a", "b", "c"].iter().map(|t| t.to_string()).collect(),
            edges: vec![
                GraphEdge::new("alpha", "c", EdgeType::Introduces),
                GraphEdge::new("alpha", "b", EdgeType::Introduces),
                GraphEdge::new("alpha", "a", EdgeType::Introduces),
                GraphEdge::new("alpha", "b", EdgeType::Introduces),
                GraphEdge::new("beta", "a", EdgeType::Introduces),
                GraphEdge::new("beta", "b", EdgeType::Introduces),
                GraphEdge::new("beta", "c", EdgeType::Introduces),
                GraphEdge::new("beta", "c", EdgeType::Uses),
            ],
        };
        assert_eq!(graph.introduced_terms("alpha"), vec!["a", "b", "c"]);
        assert_eq!(graph.introduced_terms("alpha"), graph.introduced_terms("beta"));
        assert!(graph.introduced_terms("ghost").is_empty());
    }
}
