//! Configuration management for the CV screener

use crate::error::{Result, ScreenerError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub caches: CacheConfig,
    pub extraction: ExtractionConfig,
    pub scoring: ScoringConfig,
    pub providers: ProviderConfig,
    pub reference: ReferenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for job-description artifacts; JDs are reused across many CVs
    /// within one hiring campaign.
    pub jd_ttl_hours: u64,
    /// TTL for extracted CV text and analysis results.
    pub cv_ttl_hours: u64,
    /// Entry cap per cache. Oldest entry is dropped when exceeded.
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Hard ceiling on uploaded file size, in megabytes.
    pub max_file_size_mb: u64,
    /// Pages of the PDF text layer probed before deciding born-digital vs scan.
    pub pdf_probe_pages: usize,
    /// Minimum alphanumeric characters in the probed text layer for a PDF to
    /// count as born-digital.
    pub min_text_layer_chars: usize,
    /// Upper bound on rasterized pages for scanned PDFs.
    pub max_ocr_pages: usize,
    /// Raster resolution passed to the page rasterizer, in DPI.
    pub render_dpi: u32,
    /// Trimmed length above which a cascade stage's output is accepted.
    pub good_ocr_chars: usize,
    /// Largest image edge submitted to OCR, in pixels.
    pub max_image_edge: u32,
    /// Local OCR language hints, e.g. "eng+vie".
    pub ocr_languages: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Default number of top reference matches kept; requests for fewer are
    /// raised to this value.
    pub top_k: usize,
    /// Query text is truncated to this many characters before embedding.
    pub max_query_chars: usize,
    /// Average-similarity thresholds mapped to bonus points, checked from
    /// highest to lowest.
    pub bonus_thresholds: Vec<BonusThreshold>,
    /// Candidate totals are clamped to this ceiling after the bonus.
    pub score_ceiling: f32,
    /// Minimum lexicon hits before an industry is considered detected.
    pub min_industry_hits: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BonusThreshold {
    pub min_similarity: f32,
    pub points: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Embedding model identifier requested from the embedding API.
    pub embedding_model: String,
    /// Base URL for the embedding API.
    pub embedding_endpoint: String,
    /// Env var holding comma-separated embedding API keys for rotation.
    pub embedding_keys_env: String,
    /// Cloud document-OCR endpoint; empty disables the stage.
    pub document_ocr_endpoint: String,
    /// Env var holding the cloud document-OCR API key.
    pub document_ocr_key_env: String,
    /// Generative vision model used for transcription fallback.
    pub vision_model: String,
    /// Base URL for the vision model API.
    pub vision_endpoint: String,
    /// Env var holding comma-separated vision API keys.
    pub vision_keys_env: String,
    /// Path to the tesseract binary for local OCR.
    pub tesseract_path: String,
    /// Path to the pdftoppm binary used to rasterize scanned PDFs.
    pub pdftoppm_path: String,
    /// HTTP timeout for provider calls, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Local directory holding per-industry reference index JSON files
    /// (`<industry>.json`). Takes precedence over `base_url` when set.
    pub dir: Option<PathBuf>,
    /// HTTP base URL serving the same files.
    pub base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            caches: CacheConfig {
                jd_ttl_hours: 72,
                cv_ttl_hours: 24,
                max_entries: 512,
            },
            extraction: ExtractionConfig {
                max_file_size_mb: 20,
                pdf_probe_pages: 3,
                min_text_layer_chars: 200,
                max_ocr_pages: 5,
                render_dpi: 200,
                good_ocr_chars: 50,
                max_image_edge: 2048,
                ocr_languages: "eng+vie".to_string(),
            },
            scoring: ScoringConfig {
                top_k: 3,
                max_query_chars: 6000,
                bonus_thresholds: vec![
                    BonusThreshold { min_similarity: 0.88, points: 5.0 },
                    BonusThreshold { min_similarity: 0.83, points: 3.5 },
                    BonusThreshold { min_similarity: 0.78, points: 2.0 },
                    BonusThreshold { min_similarity: 0.72, points: 1.0 },
                ],
                score_ceiling: 100.0,
                min_industry_hits: 3,
            },
            providers: ProviderConfig {
                embedding_model: "text-embedding-004".to_string(),
                embedding_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                embedding_keys_env: "CV_SCREENER_EMBEDDING_KEYS".to_string(),
                document_ocr_endpoint: "https://vision.googleapis.com/v1".to_string(),
                document_ocr_key_env: "CV_SCREENER_VISION_OCR_KEY".to_string(),
                vision_model: "gemini-1.5-flash".to_string(),
                vision_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                vision_keys_env: "CV_SCREENER_VISION_KEYS".to_string(),
                tesseract_path: "tesseract".to_string(),
                pdftoppm_path: "pdftoppm".to_string(),
                timeout_secs: 60,
            },
            reference: ReferenceConfig {
                dir: None,
                base_url: None,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ScreenerError::Configuration(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ScreenerError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("cv-screener")
            .join("config.toml")
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.extraction.max_file_size_mb * 1024 * 1024
    }

    pub fn jd_ttl_ms(&self) -> u64 {
        self.caches.jd_ttl_hours * 3600 * 1000
    }

    pub fn cv_ttl_ms(&self) -> u64 {
        self.caches.cv_ttl_hours * 3600 * 1000
    }
}
