//! Course knowledge-graph core.
//!
//! Parses course documents, validates them into a chapter/term knowledge
//! graph, answers eligibility queries and ranks the next chapter to study.

pub mod config;
pub mod db;
pub mod graph;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod repo;
pub mod service;
pub mod validation;

pub use config::{ConfigError, ReasonLocale, RecommenderConfig, ScoringWeights};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use graph::{GraphBuild, GraphCache};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::diagnostic::{Diagnostic, IssueCode, Location};
pub use model::graph::{EdgeType, Eligibility, GraphEdge, GraphModel, StudentProfile};
pub use model::recommendation::{FactorScore, RecommendationLogEntry, RecommendationResult};
pub use repo::graph_repo::{GraphRepository, SqliteGraphRepository};
pub use repo::knowledge_repo::{
    CourseMastery, KnowledgeRepository, MasteryVector, SqliteKnowledgeRepository,
};
pub use repo::recommendation_repo::{
    RecommendationLogRepository, SqliteRecommendationLogRepository,
};
pub use repo::{RepoError, RepoResult};
pub use service::graph_service::{GraphServiceError, KnowledgeGraphService};
pub use service::import_service::{CourseImportService, ImportError, ImportReport};
pub use service::recommendation_service::{RecommendationError, RecommendationService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
