//! Knowledge graph: construction, validation, snapshot cache and queries.

pub mod builder;
pub mod cache;
pub mod query;

pub use builder::{build_graph, validate_graph, ChapterRelations, GraphBuild};
pub use cache::GraphCache;
pub use query::{eligible_chapters, explain};
