//! Industry similarity engine
//!
//! Optional-enhancement semantics throughout: every failure mode resolves
//! to "no insight" rather than an error, and callers treat `None` as a
//! no-op on the candidate's score. Failure reasons surface in the log only.

use crate::config::ScoringConfig;
use crate::providers::{CredentialPool, Embedder};
use crate::reference::{Industry, ReferenceLibrary};
use crate::scoring::similarity::{bonus_for, rank_matches, IndustryInsight};
use log::warn;
use std::sync::Arc;

pub struct SimilarityEngine {
    settings: ScoringConfig,
    embedder: Arc<dyn Embedder>,
    credentials: CredentialPool,
    library: Arc<ReferenceLibrary>,
}

impl SimilarityEngine {
    pub fn new(
        settings: ScoringConfig,
        embedder: Arc<dyn Embedder>,
        credentials: CredentialPool,
        library: Arc<ReferenceLibrary>,
    ) -> Self {
        Self {
            settings,
            embedder,
            credentials,
            library,
        }
    }

    /// Quantifies how closely the CV text resembles the industry's curated
    /// reference profiles. Returns `None` when the query is empty, the
    /// reference index is unavailable, or embedding fails on every
    /// credential.
    pub async fn compute_industry_similarity(
        &self,
        industry: Industry,
        text: &str,
        requested_k: usize,
    ) -> Option<IndustryInsight> {
        let query = truncate_query(text, self.settings.max_query_chars);
        if query.is_empty() {
            return None;
        }

        let index = self.library.load(industry).await?;
        let vector = self.embed_with_rotation(&query).await?;

        let top_matches = rank_matches(
            &vector,
            &index.records,
            requested_k,
            self.settings.top_k,
        );
        if top_matches.is_empty() {
            warn!(
                "no comparable reference vectors for {} ({} records)",
                industry,
                index.records.len()
            );
            return None;
        }

        let average_similarity =
            top_matches.iter().map(|m| m.similarity).sum::<f32>() / top_matches.len() as f32;
        let bonus_points = bonus_for(average_similarity, &self.settings.bonus_thresholds);

        Some(IndustryInsight {
            industry,
            average_similarity,
            top_matches,
            bonus_points,
        })
    }

    /// One embedding attempt per configured credential, rotating on
    /// failure. Exhaustion resolves to `None`.
    async fn embed_with_rotation(&self, query: &str) -> Option<Vec<f32>> {
        if self.credentials.is_empty() {
            warn!("no embedding credentials configured, skipping similarity baseline");
            return None;
        }

        for _ in 0..self.credentials.len() {
            let (idx, key) = self.credentials.next()?;
            match self.embedder.embed(query, &key).await {
                Ok(vector) if !vector.is_empty() => return Some(vector),
                Ok(_) => warn!("embedding credential #{} returned an empty vector", idx),
                Err(e) => warn!("embedding failed on credential #{}: {}", idx, e),
            }
        }
        warn!(
            "all {} embedding credentials exhausted",
            self.credentials.len()
        );
        None
    }
}

/// Whitespace-trims and truncates on a char boundary to bound embedding
/// cost.
fn truncate_query(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ReferenceConfig};
    use crate::error::{Result, ScreenerError};
    use crate::reference::Industry;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Embedder whose replies are keyed by credential; records the key order.
    struct ScriptedEmbedder {
        failing_keys: Vec<String>,
        vector: Vec<f32>,
        seen_keys: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedEmbedder {
        fn new(vector: Vec<f32>, failing_keys: &[&str]) -> Self {
            Self {
                failing_keys: failing_keys.iter().map(|s| s.to_string()).collect(),
                vector,
                seen_keys: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for ScriptedEmbedder {
        async fn embed(&self, _text: &str, api_key: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys.lock().unwrap().push(api_key.to_string());
            if self.failing_keys.iter().any(|k| k == api_key) {
                return Err(ScreenerError::Embedding(format!("key {} rejected", api_key)));
            }
            Ok(self.vector.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn write_index(dir: &std::path::Path, industry: &str, vectors: &[(&str, Vec<f32>)]) {
        let records: Vec<serde_json::Value> = vectors
            .iter()
            .map(|(id, v)| {
                serde_json::json!({
                    "id": id,
                    "relativePath": format!("profiles/{}.txt", id),
                    "name": id.to_uppercase(),
                    "role": "Backend Engineer",
                    "vector": v,
                })
            })
            .collect();
        let index = serde_json::json!({
            "generatedAt": "2025-11-02T08:00:00Z",
            "model": "scripted",
            "vectorLength": vectors.first().map(|(_, v)| v.len()).unwrap_or(0),
            "recordCount": records.len(),
            "dataRoot": "profiles",
            "records": records,
        });
        let mut f = std::fs::File::create(dir.join(format!("{}.json", industry))).unwrap();
        f.write_all(index.to_string().as_bytes()).unwrap();
    }

    fn engine_with(
        dir: &std::path::Path,
        embedder: Arc<ScriptedEmbedder>,
        keys: Vec<&str>,
    ) -> SimilarityEngine {
        let library = Arc::new(ReferenceLibrary::new(ReferenceConfig {
            dir: Some(dir.to_path_buf()),
            base_url: None,
        }));
        SimilarityEngine::new(
            Config::default().scoring,
            embedder,
            CredentialPool::new(keys.into_iter().map(String::from).collect()),
            library,
        )
    }

    #[tokio::test]
    async fn test_deterministic_top_matches_and_bonus() {
        let dir = tempfile::tempdir().unwrap();
        write_index(
            dir.path(),
            "it",
            &[
                ("exact", vec![1.0, 0.0]),
                ("close", vec![0.9, 0.1]),
                ("far", vec![0.0, 1.0]),
                ("near", vec![0.8, 0.2]),
            ],
        );
        let embedder = Arc::new(ScriptedEmbedder::new(vec![1.0, 0.0], &[]));
        let engine = engine_with(dir.path(), embedder, vec!["k1"]);

        let insight = engine
            .compute_industry_similarity(Industry::It, "React, Node.js, 5 years backend", 3)
            .await
            .unwrap();

        let ids: Vec<&str> = insight.top_matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close", "near"]);
        // avg of 1.0, 0.9939, 0.9701 is above the 0.88 cutoff.
        assert!(insight.average_similarity > 0.88);
        assert_eq!(insight.bonus_points, 5.0);
    }

    #[tokio::test]
    async fn test_rotation_retries_after_bad_key() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "it", &[("exact", vec![1.0, 0.0])]);
        let embedder = Arc::new(ScriptedEmbedder::new(vec![1.0, 0.0], &["k1"]));
        let engine = engine_with(dir.path(), embedder.clone(), vec!["k1", "k2"]);

        let insight = engine
            .compute_industry_similarity(Industry::It, "backend", 3)
            .await;
        assert!(insight.is_some());
        assert_eq!(
            *embedder.seen_keys.lock().unwrap(),
            vec!["k1".to_string(), "k2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_all_credentials_exhausted_is_none() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "it", &[("exact", vec![1.0, 0.0])]);
        let embedder = Arc::new(ScriptedEmbedder::new(vec![1.0, 0.0], &["k1", "k2"]));
        let engine = engine_with(dir.path(), embedder.clone(), vec!["k1", "k2"]);

        let insight = engine
            .compute_industry_similarity(Industry::It, "backend", 3)
            .await;
        assert!(insight.is_none());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_text_is_none_without_embedding() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "it", &[("exact", vec![1.0, 0.0])]);
        let embedder = Arc::new(ScriptedEmbedder::new(vec![1.0, 0.0], &[]));
        let engine = engine_with(dir.path(), embedder.clone(), vec!["k1"]);

        assert!(engine
            .compute_industry_similarity(Industry::It, "   ", 3)
            .await
            .is_none());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_index_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(ScriptedEmbedder::new(vec![1.0, 0.0], &[]));
        let engine = engine_with(dir.path(), embedder, vec!["k1"]);

        assert!(engine
            .compute_industry_similarity(Industry::Sales, "sales pitch", 3)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_no_credentials_is_none() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "it", &[("exact", vec![1.0, 0.0])]);
        let embedder = Arc::new(ScriptedEmbedder::new(vec![1.0, 0.0], &[]));
        let engine = engine_with(dir.path(), embedder, vec![]);

        assert!(engine
            .compute_industry_similarity(Industry::It, "backend", 3)
            .await
            .is_none());
    }

    #[test]
    fn test_truncate_query_respects_char_boundaries() {
        let text = "đặng ".repeat(2000);
        let truncated = truncate_query(&text, 6000);
        assert_eq!(truncated.chars().count(), 6000);
    }
}
