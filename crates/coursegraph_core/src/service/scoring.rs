//! Pure scoring math for chapter recommendations.
//!
//! Mastery vectors map term key -> score in `[0, 1]`; a term without an entry
//! counts as 0 wherever a value is needed.

use crate::repo::knowledge_repo::{CourseMastery, MasteryVector};
use std::collections::BTreeSet;

/// Terms whose mastery reaches `threshold`.
pub fn mastered_terms(vector: &MasteryVector, threshold: f64) -> BTreeSet<String> {
    vector
        .iter()
        .filter(|(_, score)| **score >= threshold)
        .map(|(term, _)| term.clone())
        .collect()
}

/// Share of `introduced` terms not yet mastered; 0 for a chapter that introduces nothing.
pub fn new_coverage(introduced: &[&str], vector: &MasteryVector, threshold: f64) -> f64 {
    if introduced.is_empty() {
        return 0.0;
    }
    let fresh = introduced
        .iter()
        .filter(|term| vector.get(**term).copied().unwrap_or(0.0) < threshold)
        .count();
    fresh as f64 / introduced.len() as f64
}

pub fn average_mastery(vector: &MasteryVector, default: f64) -> f64 {
    if vector.is_empty() {
        return default;
    }
    vector.values().sum::<f64>() / vector.len() as f64
}

/// `1 - min(1, |difficulty - target| / span)` with `target = 1 + span * avg_mastery`.
pub fn difficulty_fit(difficulty: i32, avg_mastery: f64, span: f64) -> f64 {
    let target = 1.0 + span * avg_mastery;
    1.0 - ((f64::from(difficulty) - target).abs() / span).min(1.0)
}

/// Cosine similarity over the union of both key sets; 0 when either norm is 0.
pub fn cosine_similarity(a: &MasteryVector, b: &MasteryVector) -> f64 {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for key in keys {
        let va = a.get(key).copied().unwrap_or(0.0);
        let vb = b.get(key).copied().unwrap_or(0.0);
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Mean mastery of similar peers on the chapter's introduced terms.
///
/// Only peers other than `student_id` with similarity >= `threshold` count,
/// and only for terms they actually have a score for. Peers are visited in
/// student-id order so equal inputs always sum to the same value.
pub fn historical_success(
    student_id: &str,
    student: &MasteryVector,
    introduced: &[&str],
    peers: &CourseMastery,
    threshold: f64,
) -> f64 {
    if introduced.is_empty() {
        return 0.0;
    }

    let (total, count) = peers
        .iter()
        .filter(|(peer_id, _)| peer_id.as_str() != student_id)
        .filter(|(_, vector)| cosine_similarity(student, vector) >= threshold)
        .flat_map(|(_, vector)| introduced.iter().filter_map(move |term| vector.get(*term)))
        .fold((0.0, 0usize), |(total, count), score| (total + score, count + 1));

    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::{
        average_mastery, cosine_similarity, difficulty_fit, historical_success, mastered_terms,
        new_coverage,
    };
    use crate::repo::knowledge_repo::{CourseMastery, MasteryVector};

    fn vector(pairs: &[(&str, f64)]) -> MasteryVector {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn threshold_is_inclusive() {
        let v = vector(&[("a", 0.6), ("b", 0.59)]);
        assert_eq!(mastered_terms(&v, 0.6).into_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn coverage_counts_unknown_terms_as_new() {
        let v = vector(&[("a", 0.9), ("b", 0.1)]);
        assert!(close(new_coverage(&["a", "b", "c"], &v, 0.6), 2.0 / 3.0));
        assert_eq!(new_coverage(&[], &v, 0.6), 0.0);
    }

    #[test]
    fn difficulty_fit_uses_default_average() {
        let avg = average_mastery(&MasteryVector::new(), 0.4);
        assert!(close(avg, 0.4));
        // target = 2.6
        assert!(close(difficulty_fit(3, avg, 4.0), 0.9));
        assert!(close(difficulty_fit(10, avg, 4.0), 0.0));
    }

    #[test]
    fn cosine_handles_disjoint_and_zero_vectors() {
        let a = vector(&[("x", 1.0)]);
        let b = vector(&[("y", 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&a, &MasteryVector::new()), 0.0);
        assert!(close(cosine_similarity(&a, &a), 1.0));
    }

    #[test]
    fn historical_success_skips_self_and_dissimilar_peers() {
        let me = vector(&[("x", 1.0)]);
        let mut peers = CourseMastery::new();
        peers.insert("me".to_string(), vector(&[("x", 1.0), ("t", 0.0)]));
        peers.insert("twin".to_string(), vector(&[("x", 0.9), ("t", 0.8)]));
        peers.insert("other".to_string(), vector(&[("y", 1.0), ("t", 0.2)]));
        peers.insert("partial".to_string(), vector(&[("x", 0.5)]));

        let score = historical_success("me", &me, &["t"], &peers, 0.3);
        assert!(close(score, 0.8));
        assert_eq!(historical_success("me", &me, &[], &peers, 0.3), 0.0);
    }
}
