//! Recommendation value types and the factor-list codec.
//!
//! # Invariants
//! - Factor order is significant and preserved by the codec.
//! - `kv1` encodes values with exactly 4 decimals and `.` as separator,
//!   independent of host locale.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Share of a chapter's introduced terms the student has not mastered yet.
pub const FACTOR_NEW_COVERAGE: &str = "new_term_coverage";
/// Closeness of chapter difficulty to the student's target difficulty.
pub const FACTOR_DIFFICULTY_FIT: &str = "difficulty_fit";
/// Mean mastery of similar students on the chapter's introduced terms.
pub const FACTOR_HISTORICAL_SUCCESS: &str = "historical_success_similar";

/// Encoding tag stored next to every serialized factor list.
pub const FACTOR_ENCODING_KV1: &str = "kv1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub name: String,
    pub value: f64,
}

impl FactorScore {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Outcome of one "what next" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// `None` when no chapter is eligible.
    pub chapter_id: Option<String>,
    pub score: f64,
    pub reason: String,
    pub factors: Vec<FactorScore>,
    /// Set for cold-start scoring and for the "nothing eligible" result.
    pub cold_start_fallback: bool,
    pub recommender_version: String,
}

/// Persisted recommendation log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationLogEntry {
    pub log_id: String,
    pub student_id: String,
    pub course_id: String,
    pub chapter_id: String,
    pub score: f64,
    pub reason: String,
    pub factors: Vec<FactorScore>,
    pub recommender_version: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Malformed `kv1` factor string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorDecodeError(pub String);

impl Display for FactorDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid factor encoding: {}", self.0)
    }
}

impl Error for FactorDecodeError {}

/// Serializes factors as `name=value;...` with 4-decimal values.
pub fn encode_factors(factors: &[FactorScore]) -> String {
    factors
        .iter()
        .map(|factor| format!("{}={:.4}", factor.name, factor.value))
        .collect::<Vec<_>>()
        .join(";")
}

/// Parses a `kv1` factor string produced by [`encode_factors`].
pub fn decode_factors(encoded: &str) -> Result<Vec<FactorScore>, FactorDecodeError> {
    if encoded.trim().is_empty() {
        return Ok(Vec::new());
    }

    encoded
        .split(';')
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| FactorDecodeError(format!("missing `=` in `{pair}`")))?;
            if name.is_empty() {
                return Err(FactorDecodeError(format!("empty factor name in `{pair}`")));
            }
            let value = value
                .parse::<f64>()
                .map_err(|_| FactorDecodeError(format!("non-numeric value in `{pair}`")))?;
            Ok(FactorScore::new(name, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{decode_factors, encode_factors, FactorScore};

    #[test]
    fn encode_uses_fixed_four_decimals() {
        let encoded = encode_factors(&[
            FactorScore::new("new_term_coverage", 1.0),
            FactorScore::new("difficulty_fit", 2.0 / 3.0),
        ]);
        assert_eq!(encoded, "new_term_coverage=1.0000;difficulty_fit=0.6667");
    }

    #[test]
    fn decode_reads_back_names_in_order() {
        let decoded = decode_factors("a=0.5000;b=0.2500").unwrap();
        assert_eq!(decoded[0], FactorScore::new("a", 0.5));
        assert_eq!(decoded[1], FactorScore::new("b", 0.25));
    }

    #[test]
    fn decode_rejects_malformed_pairs() {
        assert!(decode_factors("a0.5").is_err());
        assert!(decode_factors("a=x").is_err());
        assert!(decode_factors("=0.1").is_err());
        assert!(decode_factors("").unwrap().is_empty());
    }
}
