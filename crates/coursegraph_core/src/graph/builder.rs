//! Knowledge-graph construction and structural validation.
//!
//! # Responsibility
//! - Turn per-chapter relation lists into a typed edge list.
//! - Check referential integrity, prerequisite acyclicity and orphan nodes.
//!
//! # Invariants
//! - Edge order is deterministic: all `Requires`, then `Introduces`, then
//!   `Uses`, each grouped by chapter id in ascending order.
//! - Cycle detection walks only `Requires` edges, uses an explicit stack and
//!   stops at the first back edge.

use crate::model::diagnostic::{Diagnostic, IssueCode};
use crate::model::graph::{EdgeType, GraphEdge, GraphModel};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Chapter-keyed relation lists as declared in the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterRelations {
    pub requires: BTreeMap<String, Vec<String>>,
    pub introduces: BTreeMap<String, Vec<String>>,
    pub uses: BTreeMap<String, Vec<String>>,
}

/// A freshly built graph together with its validation findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphBuild {
    pub graph: GraphModel,
    pub issues: Vec<Diagnostic>,
}

impl GraphBuild {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    InProgress,
    Done,
}

/// Builds the typed graph for one course and validates it.
pub fn build_graph(
    course_id: &str,
    chapter_nodes: BTreeSet<String>,
    term_nodes: BTreeSet<String>,
    relations: &ChapterRelations,
) -> GraphBuild {
    let mut edges = Vec::new();
    for (kind, map) in [
        (EdgeType::Requires, &relations.requires),
        (EdgeType::Introduces, &relations.introduces),
        (EdgeType::Uses, &relations.uses),
    ] {
        for (chapter_id, targets) in map {
            edges.extend(
                targets
                    .iter()
                    .map(|target| GraphEdge::new(chapter_id.as_str(), target.as_str(), kind)),
            );
        }
    }

    let graph = GraphModel {
        course_id: course_id.to_string(),
        chapter_nodes,
        term_nodes,
        edges,
    };
    let issues = validate_graph(&graph);
    GraphBuild { graph, issues }
}

/// Runs every structural check and returns all findings.
pub fn validate_graph(graph: &GraphModel) -> Vec<Diagnostic> {
    let mut issues = Vec::new();

    for edge in &graph.edges {
        let endpoint = format!("{}->{}", edge.from, edge.to);
        match edge.kind {
            EdgeType::Requires => {
                if !graph.chapter_nodes.contains(&edge.from)
                    || !graph.chapter_nodes.contains(&edge.to)
                {
                    issues.push(Diagnostic::at_node(
                        IssueCode::ChapterRefNotFound,
                        "requires edge references missing chapter",
                        endpoint,
                        edge.kind.as_role(),
                    ));
                }
            }
            EdgeType::Introduces | EdgeType::Uses => {
                if !graph.chapter_nodes.contains(&edge.from) || !graph.term_nodes.contains(&edge.to)
                {
                    issues.push(Diagnostic::at_node(
                        IssueCode::TermRefNotFound,
                        "chapter-term edge references missing node",
                        endpoint,
                        edge.kind.as_role(),
                    ));
                }
            }
        }
    }

    if let Some(cycle) = find_prerequisite_cycle(graph) {
        let closing = cycle.last().cloned().unwrap_or_default();
        issues.push(Diagnostic::at_node(
            IssueCode::CycleDetected,
            format!("prerequisite cycle: {}", cycle.join(" -> ")),
            closing,
            "cycle",
        ));
    }

    let mut touched_chapters: HashSet<&str> = HashSet::new();
    let mut targeted_terms: HashSet<&str> = HashSet::new();
    for edge in &graph.edges {
        touched_chapters.insert(edge.from.as_str());
        if edge.kind.targets_term() {
            targeted_terms.insert(edge.to.as_str());
        } else {
            touched_chapters.insert(edge.to.as_str());
        }
    }

    for chapter in &graph.chapter_nodes {
        if !touched_chapters.contains(chapter.as_str()) {
            issues.push(Diagnostic::at_node(
                IssueCode::OrphanChapter,
                "chapter has no graph links",
                chapter.as_str(),
                "orphan",
            ));
        }
    }
    for term in &graph.term_nodes {
        if !targeted_terms.contains(term.as_str()) {
            issues.push(Diagnostic::at_node(
                IssueCode::OrphanTerm,
                "term is not introduced or used by any chapter",
                term.as_str(),
                "orphan",
            ));
        }
    }

    issues
}

/// Returns the first prerequisite cycle found as `a -> ... -> a`, if any.
///
/// Three-color DFS over `Requires` edges with an explicit stack of
/// `(node, next_neighbor_index)` frames.
pub fn find_prerequisite_cycle(graph: &GraphModel) -> Option<Vec<String>> {
    let mut adjacency: BTreeMap<&str, Vec<&str>> = graph
        .chapter_nodes
        .iter()
        .map(|chapter| (chapter.as_str(), Vec::new()))
        .collect();
    for edge in graph.edges_of(EdgeType::Requires) {
        if let Some(next) = adjacency.get_mut(edge.from.as_str()) {
            next.push(edge.to.as_str());
        }
    }

    let mut colors: HashMap<&str, Color> = HashMap::new();
    for root in graph.chapter_nodes.iter().map(String::as_str) {
        if colors.contains_key(root) {
            continue;
        }

        colors.insert(root, Color::InProgress);
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some(&(node, cursor)) = stack.last() {
            let neighbors = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);
            let Some(&next) = neighbors.get(cursor) else {
                colors.insert(node, Color::Done);
                stack.pop();
                continue;
            };
            if let Some(frame) = stack.last_mut() {
                frame.1 += 1;
            }

            match colors.get(next) {
                Some(Color::InProgress) => {
                    let start = stack
                        .iter()
                        .position(|(visiting, _)| *visiting == next)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    cycle.push(next.to_string());
                    return Some(cycle);
                }
                Some(Color::Done) => {}
                None => {
                    colors.insert(next, Color::InProgress);
                    stack.push((next, 0));
                }
            }
        }
    }

    None
}
