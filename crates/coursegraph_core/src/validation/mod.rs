//! Document-level validation that runs after parsing.
//!
//! # See also
//! - `graph::builder` for structural checks on the derived knowledge graph.

pub mod cross_ref;

pub use cross_ref::validate_references;
