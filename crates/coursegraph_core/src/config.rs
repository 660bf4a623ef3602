//! Recommendation engine tuning.
//!
//! # Invariants
//! - `RecommenderConfig::default()` reproduces the reference scoring model.
//! - A config is only used after `validate()` succeeded.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Language of generated recommendation reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonLocale {
    #[default]
    En,
    Ru,
}

/// Linear weights for the cold-start and warm scoring modes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub cold_new_coverage: f64,
    pub cold_difficulty_fit: f64,
    pub warm_new_coverage: f64,
    pub warm_difficulty_fit: f64,
    pub warm_historical_success: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cold_new_coverage: 0.65,
            cold_difficulty_fit: 0.35,
            warm_new_coverage: 0.4,
            warm_difficulty_fit: 0.2,
            warm_historical_success: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Mastery at or above this counts as mastered.
    pub mastery_threshold: f64,
    /// Fewer distinct students than this means cold start.
    pub cold_start_min_students: usize,
    /// Minimum cosine similarity for a peer to count as similar.
    pub similarity_threshold: f64,
    pub default_difficulty: i32,
    /// Average mastery assumed for a student without any rows.
    pub default_avg_mastery: f64,
    /// Difficulty distance at which the fit reaches zero.
    pub difficulty_span: f64,
    pub weights: ScoringWeights,
    pub reason_locale: ReasonLocale,
    pub recommender_version: String,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: 0.6,
            cold_start_min_students: 3,
            similarity_threshold: 0.3,
            default_difficulty: 3,
            default_avg_mastery: 0.4,
            difficulty_span: 4.0,
            weights: ScoringWeights::default(),
            reason_locale: ReasonLocale::En,
            recommender_version: "hybrid-v1".to_string(),
        }
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid config `{}`: {}", self.field, self.message)
    }
}

impl Error for ConfigError {}

impl RecommenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("mastery_threshold", self.mastery_threshold),
            ("similarity_threshold", self.similarity_threshold),
            ("default_avg_mastery", self.default_avg_mastery),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError {
                    field,
                    message: format!("expected a value in [0, 1], got {value}"),
                });
            }
        }

        if !self.difficulty_span.is_finite() || self.difficulty_span <= 0.0 {
            return Err(ConfigError {
                field: "difficulty_span",
                message: format!("expected a positive value, got {}", self.difficulty_span),
            });
        }

        let weights = &self.weights;
        for (field, value) in [
            ("weights.cold_new_coverage", weights.cold_new_coverage),
            ("weights.cold_difficulty_fit", weights.cold_difficulty_fit),
            ("weights.warm_new_coverage", weights.warm_new_coverage),
            ("weights.warm_difficulty_fit", weights.warm_difficulty_fit),
            ("weights.warm_historical_success", weights.warm_historical_success),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError {
                    field,
                    message: format!("expected a non-negative weight, got {value}"),
                });
            }
        }

        if self.recommender_version.trim().is_empty() {
            return Err(ConfigError {
                field: "recommender_version",
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
