//! Domain model for courses, knowledge graphs and recommendations.
//!
//! # Responsibility
//! - Define canonical data structures shared by import, query and scoring.
//!
//! # Invariants
//! - Chapters are identified by id, terms by key, both unique per course.
//! - Diagnostics from every stage use the single `Diagnostic` shape.

pub mod course;
pub mod diagnostic;
pub mod graph;
pub mod recommendation;
