//! "What to study next" recommendation engine.
//!
//! # Responsibility
//! - Rank eligible chapters by coverage, difficulty fit and peer success.
//! - Log every selected recommendation.
//!
//! # Invariants
//! - Candidates are scored in ascending chapter-id order and replaced only on
//!   a strictly greater score, so ties resolve to the smallest id.
//! - No eligible chapter (or no graph) yields the sentinel result and no log row.

use crate::config::{ReasonLocale, RecommenderConfig};
use crate::graph::query;
use crate::model::graph::StudentProfile;
use crate::model::recommendation::{
    encode_factors, FactorScore, RecommendationLogEntry, RecommendationResult,
    FACTOR_DIFFICULTY_FIT, FACTOR_HISTORICAL_SUCCESS, FACTOR_NEW_COVERAGE,
};
use crate::repo::graph_repo::GraphRepository;
use crate::repo::knowledge_repo::{CourseMastery, KnowledgeRepository};
use crate::repo::recommendation_repo::RecommendationLogRepository;
use crate::repo::{now_epoch_ms, RepoError};
use crate::service::graph_service::{GraphServiceError, KnowledgeGraphService};
use crate::service::scoring;
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum RecommendationError {
    Graph(GraphServiceError),
    Repo(RepoError),
}

impl Display for RecommendationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graph(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RecommendationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Graph(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<GraphServiceError> for RecommendationError {
    fn from(value: GraphServiceError) -> Self {
        Self::Graph(value)
    }
}

impl From<RepoError> for RecommendationError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type RecommendationResultOf<T> = Result<T, RecommendationError>;

/// Factor values of one scored candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Factors {
    new_coverage: f64,
    difficulty_fit: f64,
    historical_success: f64,
}

pub struct RecommendationService<'a, G, K, L>
where
    G: GraphRepository,
    K: KnowledgeRepository,
    L: RecommendationLogRepository,
{
    graphs: &'a KnowledgeGraphService<G>,
    knowledge: K,
    log: L,
    config: RecommenderConfig,
}

impl<'a, G, K, L> RecommendationService<'a, G, K, L>
where
    G: GraphRepository,
    K: KnowledgeRepository,
    L: RecommendationLogRepository,
{
    /// Creates the engine. `config` is expected to have passed `validate()`.
    pub fn new(
        graphs: &'a KnowledgeGraphService<G>,
        knowledge: K,
        log: L,
        config: RecommenderConfig,
    ) -> Self {
        Self {
            graphs,
            knowledge,
            log,
            config,
        }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Picks the next chapter for the student and logs the choice.
    pub fn next(
        &self,
        student_id: &str,
        course_id: &str,
        completed_chapters: &BTreeSet<String>,
    ) -> RecommendationResultOf<RecommendationResult> {
        let config = &self.config;
        let mastery = self.knowledge.load_student_mastery(student_id, course_id)?;
        let profile = StudentProfile {
            completed_chapters: completed_chapters.clone(),
            mastered_terms: scoring::mastered_terms(&mastery, config.mastery_threshold),
        };

        let graph = self.graphs.read_model(course_id)?;
        let eligible = graph
            .as_deref()
            .map(|graph| query::eligible_chapters(graph, &profile))
            .unwrap_or_default();
        let Some(graph) = graph.filter(|_| !eligible.is_empty()) else {
            info!(
                "event=recommendation module=recommendation status=ok mode=none course_id={course_id} candidates=0"
            );
            return Ok(self.nothing_eligible());
        };

        let cold_start = self.knowledge.count_students(course_id)? < config.cold_start_min_students;
        let peers = if cold_start {
            CourseMastery::new()
        } else {
            self.knowledge.load_course_mastery(course_id)?
        };
        let difficulties = self.graphs.chapter_difficulties(course_id)?;
        let avg_mastery = scoring::average_mastery(&mastery, config.default_avg_mastery);

        let mut best: Option<(String, f64, Factors)> = None;
        for chapter_id in &eligible {
            let introduced = graph.introduced_terms(chapter_id);
            let difficulty = difficulties
                .get(chapter_id)
                .copied()
                .unwrap_or(config.default_difficulty);
            let factors = Factors {
                new_coverage: scoring::new_coverage(&introduced, &mastery, config.mastery_threshold),
                difficulty_fit: scoring::difficulty_fit(
                    difficulty,
                    avg_mastery,
                    config.difficulty_span,
                ),
                historical_success: if cold_start {
                    0.0
                } else {
                    scoring::historical_success(
                        student_id,
                        &mastery,
                        &introduced,
                        &peers,
                        config.similarity_threshold,
                    )
                },
            };
            let score = self.score(cold_start, &factors);
            if best.as_ref().map_or(true, |(_, top, _)| score > *top) {
                best = Some((chapter_id.clone(), score, factors));
            }
        }

        let Some((chapter_id, score, factors)) = best else {
            return Ok(self.nothing_eligible());
        };
        let result = RecommendationResult {
            chapter_id: Some(chapter_id.clone()),
            score,
            reason: self.reason(cold_start, &factors),
            factors: self.factor_list(cold_start, &factors),
            cold_start_fallback: cold_start,
            recommender_version: config.recommender_version.clone(),
        };

        let entry = RecommendationLogEntry {
            log_id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            chapter_id,
            score,
            reason: result.reason.clone(),
            factors: result.factors.clone(),
            recommender_version: result.recommender_version.clone(),
            created_at: now_epoch_ms(),
        };
        if let Err(err) = self.log.append_log(&entry) {
            warn!(
                "event=recommendation module=recommendation status=error course_id={course_id} error_code=log_append_failed error={err}"
            );
            return Err(err.into());
        }

        info!(
            "event=recommendation module=recommendation status=ok mode={} course_id={course_id} candidates={} chapter_id={} factors={}",
            if cold_start { "cold" } else { "warm" },
            eligible.len(),
            entry.chapter_id,
            encode_factors(&entry.factors)
        );
        Ok(result)
    }

    /// Logged recommendations for the student, newest first.
    pub fn list_recommendations(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> RecommendationResultOf<Vec<RecommendationLogEntry>> {
        Ok(self.log.list_logs(student_id, course_id)?)
    }

    fn score(&self, cold_start: bool, factors: &Factors) -> f64 {
        let weights = &self.config.weights;
        if cold_start {
            weights.cold_new_coverage * factors.new_coverage
                + weights.cold_difficulty_fit * factors.difficulty_fit
        } else {
            weights.warm_new_coverage * factors.new_coverage
                + weights.warm_difficulty_fit * factors.difficulty_fit
                + weights.warm_historical_success * factors.historical_success
        }
    }

    fn factor_list(&self, cold_start: bool, factors: &Factors) -> Vec<FactorScore> {
        let mut list = vec![
            FactorScore::new(FACTOR_NEW_COVERAGE, factors.new_coverage),
            FactorScore::new(FACTOR_DIFFICULTY_FIT, factors.difficulty_fit),
        ];
        if !cold_start {
            list.push(FactorScore::new(
                FACTOR_HISTORICAL_SUCCESS,
                factors.historical_success,
            ));
        }
        list
    }

    fn reason(&self, cold_start: bool, factors: &Factors) -> String {
        let Factors {
            new_coverage,
            difficulty_fit,
            historical_success,
        } = *factors;
        match (self.config.reason_locale, cold_start) {
            (ReasonLocale::En, true) => format!(
                "Cold start: chapter with the highest new-term coverage ({new_coverage:.2}) and a good difficulty fit ({difficulty_fit:.2})"
            ),
            (ReasonLocale::En, false) => format!(
                "Chapter chosen by combined factors: new terms={new_coverage:.2}, difficulty={difficulty_fit:.2}, similar students' success={historical_success:.2}"
            ),
            (ReasonLocale::Ru, true) => format!(
                "Cold-start: выбрана глава с максимальным покрытием новых терминов ({new_coverage:.2}) и хорошим уровнем сложности ({difficulty_fit:.2})"
            ),
            (ReasonLocale::Ru, false) => format!(
                "Глава выбрана по сумме факторов: новые термины={new_coverage:.2}, сложность={difficulty_fit:.2}, успех похожих студентов={historical_success:.2}"
            ),
        }
    }

    fn nothing_eligible(&self) -> RecommendationResult {
        let reason = match self.config.reason_locale {
            ReasonLocale::En => "No logically available chapters",
            ReasonLocale::Ru => "Нет логически доступных глав",
        };
        RecommendationResult {
            chapter_id: None,
            score: 0.0,
            reason: reason.to_string(),
            factors: Vec::new(),
            cold_start_fallback: true,
            recommender_version: self.config.recommender_version.clone(),
        }
    }
}
