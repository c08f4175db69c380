//! Cosine similarity, top-K ranking, and the bonus step function

use crate::config::BonusThreshold;
use crate::reference::{Industry, ReferenceRecord};
use serde::{Deserialize, Serialize};

/// One reference record scored against the query vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub similarity: f32,
    pub relative_path: String,
}

/// Derived, read-only insight attached at most once to a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryInsight {
    pub industry: Industry,
    pub average_similarity: f32,
    pub top_matches: Vec<SimilarityMatch>,
    pub bonus_points: f32,
}

/// Cosine similarity, or `None` for mismatched dimensions or a zero-length
/// vector. Excluded pairs never become NaN in an average.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot_product / (norm_a * norm_b))
}

/// Scores every reference record against the query vector, drops invalid
/// pairs, and keeps the top `max(requested_k, default_k)` sorted strictly
/// descending.
pub fn rank_matches(
    query: &[f32],
    records: &[ReferenceRecord],
    requested_k: usize,
    default_k: usize,
) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = records
        .iter()
        .filter_map(|record| {
            cosine_similarity(query, &record.vector).map(|similarity| SimilarityMatch {
                id: record.id.clone(),
                name: record.name.clone(),
                role: record.role.clone(),
                similarity,
                relative_path: record.relative_path.clone(),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(requested_k.max(default_k));
    matches
}

/// Maps average similarity to bonus points through the threshold table,
/// checked from the highest cutoff down. A monotonic step function.
pub fn bonus_for(average_similarity: f32, thresholds: &[BonusThreshold]) -> f32 {
    let mut sorted: Vec<BonusThreshold> = thresholds.to_vec();
    sorted.sort_by(|a, b| {
        b.min_similarity
            .partial_cmp(&a.min_similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for threshold in &sorted {
        if average_similarity >= threshold.min_similarity {
            return threshold.points;
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn record(id: &str, vector: Vec<f32>) -> ReferenceRecord {
        ReferenceRecord {
            id: id.to_string(),
            relative_path: format!("profiles/{}.txt", id),
            name: Some(id.to_uppercase()),
            role: Some("Engineer".to_string()),
            summary_snippet: None,
            vector,
            metadata: None,
        }
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_invalid_pairs_excluded() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0]).is_none());
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).is_none());
        assert!(cosine_similarity(&[], &[]).is_none());
    }

    #[test]
    fn test_rank_matches_sorted_descending() {
        let records = vec![
            record("low", vec![0.0, 1.0]),
            record("high", vec![1.0, 0.0]),
            record("mid", vec![1.0, 1.0]),
        ];
        let matches = rank_matches(&[1.0, 0.0], &records, 3, 3);
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        for pair in matches.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_rank_matches_requested_k_below_default_is_raised() {
        let records: Vec<ReferenceRecord> = (0..10)
            .map(|i| record(&format!("r{}", i), vec![1.0, i as f32 / 10.0]))
            .collect();
        assert_eq!(rank_matches(&[1.0, 0.0], &records, 1, 3).len(), 3);
        assert_eq!(rank_matches(&[1.0, 0.0], &records, 5, 3).len(), 5);
    }

    #[test]
    fn test_rank_matches_capped_by_record_count() {
        let records = vec![record("only", vec![1.0, 0.0])];
        assert_eq!(rank_matches(&[1.0, 0.0], &records, 5, 3).len(), 1);
    }

    #[test]
    fn test_rank_matches_skips_bad_vectors() {
        let records = vec![
            record("good", vec![1.0, 0.0]),
            record("zero", vec![0.0, 0.0]),
            record("short", vec![1.0]),
        ];
        let matches = rank_matches(&[1.0, 0.0], &records, 3, 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "good");
        assert!(!matches[0].similarity.is_nan());
    }

    #[test]
    fn test_bonus_step_function() {
        let thresholds = Config::default().scoring.bonus_thresholds;
        assert_eq!(bonus_for(0.90, &thresholds), 5.0);
        assert_eq!(bonus_for(0.85, &thresholds), 3.5);
        assert_eq!(bonus_for(0.80, &thresholds), 2.0);
        assert_eq!(bonus_for(0.75, &thresholds), 1.0);
        assert_eq!(bonus_for(0.50, &thresholds), 0.0);
    }

    #[test]
    fn test_bonus_exact_cutoffs_inclusive() {
        let thresholds = Config::default().scoring.bonus_thresholds;
        assert_eq!(bonus_for(0.88, &thresholds), 5.0);
        assert_eq!(bonus_for(0.8799, &thresholds), 3.5);
        assert_eq!(bonus_for(0.72, &thresholds), 1.0);
    }

    #[test]
    fn test_bonus_monotonic() {
        let thresholds = Config::default().scoring.bonus_thresholds;
        let mut last = -1.0f32;
        for step in 0..=100 {
            let avg = step as f32 / 100.0;
            let bonus = bonus_for(avg, &thresholds);
            assert!(bonus >= last, "bonus regressed at avg {}", avg);
            last = bonus;
        }
    }
}
