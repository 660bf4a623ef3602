//! Eligibility queries over one immutable graph snapshot.
//!
//! # Invariants
//! - Eligibility is one-hop: only direct `Requires` and `Uses` targets gate a
//!   chapter.
//! - Every returned id list is lexicographically sorted.

use crate::model::graph::{EdgeType, Eligibility, GraphModel, StudentProfile};

/// Explains why `chapter_id` is or is not open to the student.
///
/// Returns `None` when the chapter is not a node of `graph`.
pub fn explain(graph: &GraphModel, chapter_id: &str, profile: &StudentProfile) -> Option<Eligibility> {
    if !graph.has_chapter(chapter_id) {
        return None;
    }

    let missing_chapters: Vec<String> = graph
        .targets(chapter_id, EdgeType::Requires)
        .into_iter()
        .filter(|required| !profile.completed_chapters.contains(*required))
        .map(str::to_string)
        .collect();
    let missing_terms: Vec<String> = graph
        .targets(chapter_id, EdgeType::Uses)
        .into_iter()
        .filter(|term| !profile.mastered_terms.contains(*term))
        .map(str::to_string)
        .collect();

    Some(Eligibility {
        chapter_id: chapter_id.to_string(),
        eligible: missing_chapters.is_empty() && missing_terms.is_empty(),
        missing_chapters,
        missing_terms,
    })
}

/// Not-yet-completed chapters the student may start, sorted.
pub fn eligible_chapters(graph: &GraphModel, profile: &StudentProfile) -> Vec<String> {
    graph
        .chapter_nodes
        .iter()
        .filter(|chapter| !profile.completed_chapters.contains(*chapter))
        .filter(|chapter| {
            explain(graph, chapter, profile).is_some_and(|verdict| verdict.eligible)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{eligible_chapters, explain};
    use crate::model::graph::{EdgeType, GraphEdge, GraphModel, StudentProfile};

    fn course() -> GraphModel {
        GraphModel {
            course_id: "c".into(),
            chapter_nodes: ["ch1", "ch2", "ch3"].iter().map(|s| s.to_string()).collect(),
            term_nodes: ["algorithm", "complexity"].iter().map(|s| s.to_string()).collect(),
            edges: vec![
                GraphEdge::new("ch2", "ch1", EdgeType::Requires),
                GraphEdge::new("ch3", "ch2", EdgeType::Requires),
                GraphEdge::new("ch1", "algorithm", EdgeType::Introduces),
                GraphEdge::new("ch2", "complexity", EdgeType::Uses),
                GraphEdge::new("ch3", "algorithm", EdgeType::Uses),
            ],
        }
    }

    #[test]
    fn missing_lists_are_reported() {
        let verdict = explain(&course(), "ch2", &StudentProfile::default()).unwrap();
        assert!(!verdict.eligible);
        assert_eq!(verdict.missing_chapters, vec!["ch1"]);
        assert_eq!(verdict.missing_terms, vec!["complexity"]);
    }

    #[test]
    fn unknown_chapter_has_no_verdict() {
        assert!(explain(&course(), "ghost", &StudentProfile::default()).is_none());
    }

    #[test]
    fn eligibility_is_one_hop() {
        let profile = StudentProfile::new(["ch2"], ["algorithm"]);
        assert_eq!(eligible_chapters(&course(), &profile), vec!["ch1", "ch3"]);
    }

    #[test]
    fn completed_chapters_are_excluded() {
        let profile = StudentProfile::new(["ch1"], ["complexity"]);
        assert_eq!(eligible_chapters(&course(), &profile), vec!["ch2"]);
    }
}
