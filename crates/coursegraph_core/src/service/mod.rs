//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate parsing, validation, graph publication and scoring.
//! - Keep CLI and other callers decoupled from storage details.

pub mod graph_service;
pub mod import_service;
pub mod recommendation_service;
pub mod scoring;
