//! Knowledge graph use-case service.
//!
//! # Responsibility
//! - Publish validated course graphs to storage and the snapshot cache.
//! - Serve eligibility queries from cached or rehydrated snapshots.
//!
//! # Invariants
//! - A graph with any issue is neither persisted nor cached.
//! - Storage is written before the cache swap, so the cache never holds a
//!   graph the store does not.
//! - A course with no stored relation rows has no graph ("unknown").

use crate::graph::builder::{build_graph, ChapterRelations, GraphBuild};
use crate::graph::cache::GraphCache;
use crate::graph::query;
use crate::model::course::Chapter;
use crate::model::graph::{EdgeType, Eligibility, GraphEdge, GraphModel, StudentProfile};
use crate::repo::graph_repo::{ChapterTermPair, GraphRepository, PrerequisitePair};
use crate::repo::RepoError;
use log::{debug, error, info};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Errors from graph service operations.
#[derive(Debug)]
pub enum GraphServiceError {
    /// Storage failure while persisting or rehydrating a graph.
    Repo(RepoError),
}

impl Display for GraphServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for GraphServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type GraphServiceResult<T> = Result<T, GraphServiceError>;

/// Graph publication and query facade.
pub struct KnowledgeGraphService<R: GraphRepository> {
    repo: R,
    cache: GraphCache,
}

impl<R: GraphRepository> KnowledgeGraphService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_cache(repo, GraphCache::new())
    }

    /// Creates a service sharing an existing snapshot cache.
    pub fn with_cache(repo: R, cache: GraphCache) -> Self {
        Self { repo, cache }
    }

    pub fn cache(&self) -> &GraphCache {
        &self.cache
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Builds and validates the course graph, then publishes it when valid.
    ///
    /// With `dry_run` the validated graph is returned but neither persisted nor cached.
    /// A graph without edges stores no relation rows and reads back as "no graph",
    /// so its cache entry is evicted rather than replaced.
    pub fn build_and_publish(
        &self,
        course_id: &str,
        chapters: &[Chapter],
        term_keys: BTreeSet<String>,
        relations: &ChapterRelations,
        dry_run: bool,
    ) -> GraphServiceResult<GraphBuild> {
        let chapter_nodes = chapters.iter().map(|chapter| chapter.id.clone()).collect();
        let build = build_graph(course_id, chapter_nodes, term_keys, relations);
        if !build.is_valid() || dry_run {
            return Ok(build);
        }

        self.persist(&build.graph, chapters)?;
        if build.graph.edges.is_empty() {
            let previous = self.cache.remove(course_id);
            info!(
                "event=graph_cache module=graph status=ok action=evict course_id={course_id} replaced={}",
                previous.is_some()
            );
            return Ok(build);
        }
        let previous = self.cache.swap(Arc::new(build.graph.clone()));
        info!(
            "event=graph_cache module=graph status=ok action=swap course_id={course_id} replaced={}",
            previous.is_some()
        );
        Ok(build)
    }

    /// Returns the current graph snapshot, rehydrating it from storage on a miss.
    pub fn read_model(&self, course_id: &str) -> GraphServiceResult<Option<Arc<GraphModel>>> {
        if let Some(graph) = self.cache.get(course_id) {
            debug!("event=graph_cache module=graph status=ok action=hit course_id={course_id}");
            return Ok(Some(graph));
        }

        debug!("event=graph_cache module=graph status=ok action=miss course_id={course_id}");
        let prerequisites = self.repo.load_prerequisite_pairs(course_id)?;
        let chapter_terms = self.repo.load_chapter_term_pairs(course_id)?;
        let Some(graph) = rehydrate(course_id, &prerequisites, &chapter_terms) else {
            info!(
                "event=graph_cache module=graph status=ok action=absent course_id={course_id}"
            );
            return Ok(None);
        };

        let graph = self.cache.insert_if_absent(Arc::new(graph));
        info!(
            "event=graph_cache module=graph status=ok action=rehydrate course_id={course_id} edges={}",
            graph.edges.len()
        );
        Ok(Some(graph))
    }

    /// Eligibility verdict; `None` when the course or chapter is unknown.
    pub fn explain_chapter(
        &self,
        course_id: &str,
        chapter_id: &str,
        profile: &StudentProfile,
    ) -> GraphServiceResult<Option<Eligibility>> {
        Ok(self
            .read_model(course_id)?
            .and_then(|graph| query::explain(&graph, chapter_id, profile)))
    }

    /// Sorted eligible chapter ids; `None` when the course has no graph.
    pub fn eligible_chapters(
        &self,
        course_id: &str,
        profile: &StudentProfile,
    ) -> GraphServiceResult<Option<Vec<String>>> {
        Ok(self
            .read_model(course_id)?
            .map(|graph| query::eligible_chapters(&graph, profile)))
    }

    /// Declared chapter difficulties of the course; chapters without one are absent.
    pub fn chapter_difficulties(&self, course_id: &str) -> GraphServiceResult<HashMap<String, i32>> {
        Ok(self.repo.load_chapter_difficulties(course_id)?)
    }

    fn persist(&self, graph: &GraphModel, chapters: &[Chapter]) -> GraphServiceResult<()> {
        let started_at = Instant::now();
        let (prerequisites, chapter_terms) = relation_rows(graph);
        let result = self.repo.replace_course_graph(
            &graph.course_id,
            chapters,
            &prerequisites,
            &chapter_terms,
        );

        match result {
            Ok(()) => {
                info!(
                    "event=graph_persist module=graph status=ok course_id={} chapters={} edges={} duration_ms={}",
                    graph.course_id,
                    graph.chapter_nodes.len(),
                    graph.edges.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=graph_persist module=graph status=error course_id={} duration_ms={} error={err}",
                    graph.course_id,
                    started_at.elapsed().as_millis()
                );
                Err(err.into())
            }
        }
    }
}

/// Splits a graph into the two stored relation tables, keeping edge order.
fn relation_rows(graph: &GraphModel) -> (Vec<PrerequisitePair>, Vec<ChapterTermPair>) {
    let mut prerequisites = Vec::new();
    let mut chapter_terms = Vec::new();
    for edge in &graph.edges {
        match edge.kind {
            EdgeType::Requires => prerequisites.push(PrerequisitePair {
                chapter_id: edge.from.clone(),
                prerequisite_chapter_id: edge.to.clone(),
            }),
            EdgeType::Introduces | EdgeType::Uses => chapter_terms.push(ChapterTermPair {
                chapter_id: edge.from.clone(),
                term_key: edge.to.clone(),
                role: edge.kind,
            }),
        }
    }
    (prerequisites, chapter_terms)
}

/// Rebuilds a graph from stored relation rows; `None` when both are empty.
///
/// Node sets are the edge endpoints. For a graph that passed validation this
/// equals the declared sets, since no chapter or term is orphaned.
pub fn rehydrate(
    course_id: &str,
    prerequisites: &[PrerequisitePair],
    chapter_terms: &[ChapterTermPair],
) -> Option<GraphModel> {
    if prerequisites.is_empty() && chapter_terms.is_empty() {
        return None;
    }

    let mut chapter_nodes = BTreeSet::new();
    let mut term_nodes = BTreeSet::new();
    let mut edges = Vec::with_capacity(prerequisites.len() + chapter_terms.len());

    for pair in prerequisites {
        chapter_nodes.insert(pair.chapter_id.clone());
        chapter_nodes.insert(pair.prerequisite_chapter_id.clone());
        edges.push(GraphEdge::new(
            pair.chapter_id.as_str(),
            pair.prerequisite_chapter_id.as_str(),
            EdgeType::Requires,
        ));
    }
    for pair in chapter_terms {
        chapter_nodes.insert(pair.chapter_id.clone());
        term_nodes.insert(pair.term_key.clone());
        edges.push(GraphEdge::new(
            pair.chapter_id.as_str(),
            pair.term_key.as_str(),
            pair.role,
        ));
    }

    Some(GraphModel {
        course_id: course_id.to_string(),
        chapter_nodes,
        term_nodes,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::{rehydrate, relation_rows};
    use crate::graph::builder::{build_graph, ChapterRelations};
    use std::collections::BTreeSet;

    #[test]
    fn empty_tables_mean_no_graph() {
        assert!(rehydrate("c", &[], &[]).is_none());
    }

    #[test]
    fn relation_rows_round_trip_to_same_graph() {
        let mut relations = ChapterRelations::default();
        relations.requires.insert("b".into(), vec!["a".into()]);
        relations.introduces.insert("a".into(), vec!["x".into(), "y".into()]);
        relations.uses.insert("b".into(), vec!["y".into()]);
        let chapters: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let terms: BTreeSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        let build = build_graph("c", chapters, terms, &relations);
        assert!(build.is_valid());

        let (prerequisites, chapter_terms) = relation_rows(&build.graph);
        assert_eq!(rehydrate("c", &prerequisites, &chapter_terms), Some(build.graph));
    }
}
