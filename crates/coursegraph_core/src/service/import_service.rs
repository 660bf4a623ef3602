//! Course import pipeline.
//!
//! # Responsibility
//! - Run parse, cross-reference validation, mapping and graph validation in order.
//! - Hand valid graphs to the graph service for publication.
//!
//! # Invariants
//! - Mapping runs only when the parse and cross-reference batches are empty.
//! - Any non-empty batch leaves the previously published graph authoritative.

use crate::mapper::{chapter_relations, to_course, MappingError};
use crate::model::course::Course;
use crate::model::diagnostic::Diagnostic;
use crate::parser::doc_parser::parse_document;
use crate::repo::graph_repo::GraphRepository;
use crate::service::graph_service::{GraphServiceError, KnowledgeGraphService};
use crate::validation::cross_ref::validate_references;
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Everything an import caller needs to render the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub dry_run: bool,
    /// True when every batch is empty. A dry run can be valid without publishing.
    pub valid: bool,
    /// Present once mapping succeeded.
    pub course: Option<Course>,
    /// Parse and cross-reference diagnostics, in that order.
    pub errors: Vec<Diagnostic>,
    pub graph_issues: Vec<Diagnostic>,
}

impl ImportReport {
    pub fn published(&self) -> bool {
        self.valid && !self.dry_run
    }
}

/// Infrastructure failures during import. Document defects are reported in
/// [`ImportReport`] instead.
#[derive(Debug)]
pub enum ImportError {
    Mapping(MappingError),
    Graph(GraphServiceError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mapping(err) => write!(f, "course mapping failed: {err}"),
            Self::Graph(err) => write!(f, "graph publication failed: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Mapping(err) => Some(err),
            Self::Graph(err) => Some(err),
        }
    }
}

impl From<MappingError> for ImportError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}

impl From<GraphServiceError> for ImportError {
    fn from(value: GraphServiceError) -> Self {
        Self::Graph(value)
    }
}

pub struct CourseImportService<'a, R: GraphRepository> {
    graphs: &'a KnowledgeGraphService<R>,
}

impl<'a, R: GraphRepository> CourseImportService<'a, R> {
    pub fn new(graphs: &'a KnowledgeGraphService<R>) -> Self {
        Self { graphs }
    }

    /// Imports one course document.
    ///
    /// # Errors
    /// - `ImportError::Graph` when the validated graph cannot be stored.
    /// - `ImportError::Mapping` only for documents that slipped past validation.
    pub fn import_course(&self, content: &str, dry_run: bool) -> Result<ImportReport, ImportError> {
        let started_at = Instant::now();
        info!("event=course_import module=import status=start dry_run={dry_run}");

        let outcome = parse_document(content);
        let mut errors = outcome.errors;
        errors.extend(validate_references(&outcome.document));
        if !errors.is_empty() {
            warn!(
                "event=course_import module=import status=rejected stage=document course_id={} errors={} duration_ms={}",
                outcome.document.course_id.as_deref().unwrap_or("-"),
                errors.len(),
                started_at.elapsed().as_millis()
            );
            return Ok(ImportReport {
                dry_run,
                valid: false,
                course: None,
                errors,
                graph_issues: Vec::new(),
            });
        }

        let course = to_course(&outcome.document)?;
        let relations = chapter_relations(&outcome.document);
        let build = self
            .graphs
            .build_and_publish(
                &course.id,
                &course.chapters,
                course.term_keys().map(str::to_string).collect(),
                &relations,
                dry_run,
            )
            .map_err(|err| {
                error!(
                    "event=course_import module=import status=error course_id={} duration_ms={} error={err}",
                    course.id,
                    started_at.elapsed().as_millis()
                );
                err
            })?;

        let valid = build.is_valid();
        if valid {
            info!(
                "event=course_import module=import status=ok course_id={} chapters={} terms={} questions={} edges={} published={} duration_ms={}",
                course.id,
                course.chapters.len(),
                course.terms.len(),
                course.questions.len(),
                build.graph.edges.len(),
                !dry_run,
                started_at.elapsed().as_millis()
            );
        } else {
            warn!(
                "event=course_import module=import status=rejected stage=graph course_id={} graph_issues={} duration_ms={}",
                course.id,
                build.issues.len(),
                started_at.elapsed().as_millis()
            );
        }

        Ok(ImportReport {
            dry_run,
            valid,
            course: Some(course),
            errors,
            graph_issues: build.issues,
        })
    }
}
