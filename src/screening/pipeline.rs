//! Batch screening orchestration
//!
//! Per candidate the flow is strictly sequential: extract text, detect an
//! industry, compute the similarity insight, merge the bonus. Across a
//! batch, files run under bounded concurrency and one candidate's failure
//! never aborts the rest.

use crate::config::ScoringConfig;
use crate::error::Result;
use crate::input::{ExtractOptions, SourceFile, TextExtractionPipeline};
use crate::reference::Industry;
use crate::scoring::SimilarityEngine;
use crate::screening::candidate::{apply_similarity_bonus, Candidate};
use crate::screening::industry::IndustryDetector;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One file that could not be screened, with the reason kept for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningFailure {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ScreeningOutcome {
    pub candidates: Vec<Candidate>,
    pub failures: Vec<ScreeningFailure>,
}

pub struct ScreeningPipeline {
    cv_extractor: TextExtractionPipeline,
    jd_extractor: TextExtractionPipeline,
    detector: IndustryDetector,
    engine: SimilarityEngine,
    settings: ScoringConfig,
}

impl ScreeningPipeline {
    pub fn new(
        cv_extractor: TextExtractionPipeline,
        jd_extractor: TextExtractionPipeline,
        engine: SimilarityEngine,
        settings: ScoringConfig,
    ) -> Result<Self> {
        Ok(Self {
            cv_extractor,
            jd_extractor,
            detector: IndustryDetector::new()?,
            engine,
            settings,
        })
    }

    /// Extracts job-description text through the long-lived JD cache.
    pub async fn extract_job_description(&self, path: &Path) -> Result<String> {
        let file = SourceFile::open(path)?;
        let mut progress = |m: &str| debug!("jd {}: {}", file.stamp.name, m);
        self.jd_extractor
            .extract_text(&file, &mut progress, &ExtractOptions::default())
            .await
    }

    /// Screens one CV: extract, detect industry, attach the similarity
    /// bonus. Structural extraction problems propagate; a missing insight
    /// leaves the candidate unmodified.
    pub async fn screen_file(
        &self,
        path: &Path,
        industry_override: Option<Industry>,
        opts: &ExtractOptions,
    ) -> Result<Candidate> {
        let file = SourceFile::open(path)?;
        let mut progress = |m: &str| debug!("{}: {}", file.stamp.name, m);
        let text = self.cv_extractor.extract_text(&file, &mut progress, opts).await?;

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.stamp.name.clone());
        let mut candidate = Candidate::new(&id, &file.stamp.name, &text);

        candidate.industry = industry_override
            .or_else(|| self.detector.detect(&text, self.settings.min_industry_hits));
        match candidate.industry {
            Some(industry) => {
                if let Some(insight) = self
                    .engine
                    .compute_industry_similarity(industry, &text, self.settings.top_k)
                    .await
                {
                    apply_similarity_bonus(&mut candidate, insight, self.settings.score_ceiling);
                } else {
                    debug!("{}: no similarity baseline for {}", file.stamp.name, industry);
                }
            }
            None => debug!("{}: no industry detected", file.stamp.name),
        }
        Ok(candidate)
    }

    /// Screens a batch of files with at most `jobs` in flight.
    pub async fn screen_batch(
        self: Arc<Self>,
        files: &[PathBuf],
        industry_override: Option<Industry>,
        jobs: usize,
        opts: ExtractOptions,
    ) -> ScreeningOutcome {
        let limiter = Arc::new(Semaphore::new(jobs.max(1)));
        let mut set = JoinSet::new();
        for path in files {
            let this = Arc::clone(&self);
            let limiter = Arc::clone(&limiter);
            let path = path.clone();
            set.spawn(async move {
                // The semaphore is never closed while tasks run; a closed
                // error would only mean the batch is shutting down.
                let permit = limiter.acquire_owned().await;
                let result = match permit {
                    Ok(_permit) => this.screen_file(&path, industry_override, &opts).await,
                    Err(e) => Err(crate::error::ScreenerError::Processing(format!(
                        "batch limiter closed: {}",
                        e
                    ))),
                };
                (path, result)
            });
        }

        let mut outcome = ScreeningOutcome::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((path, Ok(candidate))) => {
                    info!("screened {} -> {:.1} points", path.display(), candidate.score);
                    outcome.candidates.push(candidate);
                }
                Ok((path, Err(e))) => {
                    warn!("screening {} failed: {}", path.display(), e);
                    outcome.failures.push(ScreeningFailure {
                        file_name: file_name_of(&path),
                        reason: e.to_string(),
                    });
                }
                Err(e) => outcome.failures.push(ScreeningFailure {
                    file_name: "<unknown>".to_string(),
                    reason: format!("screening task aborted: {}", e),
                }),
            }
        }

        outcome.candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        outcome
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::config::{Config, ReferenceConfig};
    use crate::input::ocr::VisionCascade;
    use crate::providers::{CredentialPool, Embedder};
    use crate::reference::ReferenceLibrary;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;

    /// Maps known skill words onto fixed axes so tests control similarity.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str, _api_key: &str) -> crate::error::Result<Vec<f32>> {
            let lower = text.to_lowercase();
            let it = if lower.contains("react") { 1.0 } else { 0.0 };
            let sales = if lower.contains("quota") { 1.0 } else { 0.0 };
            Ok(vec![it, sales])
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    fn write_it_index(dir: &std::path::Path) {
        let index = serde_json::json!({
            "generatedAt": "2025-11-02T08:00:00Z",
            "model": "axis",
            "vectorLength": 2,
            "recordCount": 2,
            "dataRoot": "profiles",
            "records": [
                {
                    "id": "ref-backend",
                    "relativePath": "profiles/ref-backend.txt",
                    "name": "Tran Thi B",
                    "role": "Backend Engineer",
                    "vector": [1.0, 0.0]
                },
                {
                    "id": "ref-mixed",
                    "relativePath": "profiles/ref-mixed.txt",
                    "name": "Le Van C",
                    "role": "Solutions Engineer",
                    "vector": [0.7, 0.7]
                }
            ]
        });
        let mut f = std::fs::File::create(dir.join("it.json")).unwrap();
        f.write_all(index.to_string().as_bytes()).unwrap();
    }

    fn pipeline_with(reference_dir: &std::path::Path) -> Arc<ScreeningPipeline> {
        let config = Config::default();
        let cascade = VisionCascade::new(None, None, None, 50, "eng");
        let cv_extractor = TextExtractionPipeline::new(
            config.extraction.clone(),
            cascade.clone(),
            None,
            Arc::new(Mutex::new(TtlCache::new(60_000, 64))),
        );
        let jd_extractor = TextExtractionPipeline::new(
            config.extraction.clone(),
            cascade,
            None,
            Arc::new(Mutex::new(TtlCache::new(60_000, 64))),
        );
        let library = Arc::new(ReferenceLibrary::new(ReferenceConfig {
            dir: Some(reference_dir.to_path_buf()),
            base_url: None,
        }));
        let engine = SimilarityEngine::new(
            config.scoring.clone(),
            Arc::new(AxisEmbedder),
            CredentialPool::new(vec!["test-key".to_string()]),
            library,
        );
        Arc::new(ScreeningPipeline::new(cv_extractor, jd_extractor, engine, config.scoring).unwrap())
    }

    fn write_cv(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    const IT_CV: &str = "Nguyen Van A\nSenior Backend Developer\n\
                         React, Node.js, PostgreSQL database, REST API, DevOps.";

    #[tokio::test]
    async fn test_screen_file_detects_industry_and_applies_bonus() {
        let refs = tempfile::tempdir().unwrap();
        write_it_index(refs.path());
        let cvs = tempfile::tempdir().unwrap();
        let cv = write_cv(cvs.path(), "nguyen_van_a.txt", IT_CV);

        let pipeline = pipeline_with(refs.path());
        let candidate = pipeline
            .screen_file(&cv, None, &ExtractOptions::default())
            .await
            .unwrap();

        assert_eq!(candidate.id, "nguyen_van_a");
        assert_eq!(candidate.industry, Some(Industry::It));
        let insight = candidate.embedding_insights.as_ref().unwrap();
        // Query embeds to [1, 0]: ref-backend at 1.0, ref-mixed at ~0.707.
        assert_eq!(insight.top_matches[0].id, "ref-backend");
        assert!(candidate.score > 0.0);
        assert!(candidate.details[0].evidence.contains("Tran Thi B"));
    }

    #[tokio::test]
    async fn test_screen_file_without_baseline_leaves_score_untouched() {
        let refs = tempfile::tempdir().unwrap();
        // No sales index exists; the override still sticks on the candidate.
        write_it_index(refs.path());
        let cvs = tempfile::tempdir().unwrap();
        let cv = write_cv(cvs.path(), "cv.txt", IT_CV);

        let pipeline = pipeline_with(refs.path());
        let candidate = pipeline
            .screen_file(&cv, Some(Industry::Sales), &ExtractOptions::default())
            .await
            .unwrap();

        assert_eq!(candidate.industry, Some(Industry::Sales));
        assert!(candidate.embedding_insights.is_none());
        assert_eq!(candidate.score, 0.0);
        assert!(candidate.details.is_empty());
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let refs = tempfile::tempdir().unwrap();
        write_it_index(refs.path());
        let cvs = tempfile::tempdir().unwrap();
        let good = write_cv(cvs.path(), "good.txt", IT_CV);
        let unsupported = write_cv(cvs.path(), "bad.xyz", "unreadable");
        let missing = cvs.path().join("missing.txt");

        let pipeline = pipeline_with(refs.path());
        let outcome = pipeline
            .screen_batch(
                &[good, unsupported, missing],
                None,
                2,
                ExtractOptions::default(),
            )
            .await;

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].file_name, "good.txt");
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.failures.iter().all(|f| !f.reason.is_empty()));
    }

    #[tokio::test]
    async fn test_batch_orders_by_score_then_name() {
        let refs = tempfile::tempdir().unwrap();
        write_it_index(refs.path());
        let cvs = tempfile::tempdir().unwrap();
        // Strong IT CV scores a bonus; the plain one detects no industry.
        let strong = write_cv(cvs.path(), "strong.txt", IT_CV);
        let plain = write_cv(cvs.path(), "plain.txt", "General office work history.");

        let pipeline = pipeline_with(refs.path());
        let outcome = pipeline
            .screen_batch(&[plain, strong], None, 4, ExtractOptions::default())
            .await;

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].file_name, "strong.txt");
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_job_description_extraction_is_normalized() {
        let refs = tempfile::tempdir().unwrap();
        let jds = tempfile::tempdir().unwrap();
        let jd = write_cv(jds.path(), "jd.txt", "Hiring a  backend developer.\r\n\r\n\r\n\r\nRemote.");

        let pipeline = pipeline_with(refs.path());
        let text = pipeline.extract_job_description(&jd).await.unwrap();
        assert_eq!(text, "Hiring a backend developer.\n\nRemote.");
    }
}
