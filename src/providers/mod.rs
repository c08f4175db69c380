//! External provider seams: embeddings, cloud OCR, vision transcription, local OCR
//!
//! Each trait has one HTTP/CLI implementation and is stubbed in tests. All
//! providers are optional at runtime; callers degrade when one is absent.

pub mod credentials;
pub mod gemini;
pub mod tesseract;
pub mod vision;

use crate::error::Result;
use async_trait::async_trait;

pub use credentials::CredentialPool;

/// Text embedding provider. The key is supplied per call so the caller can
/// rotate credentials on failure.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str, api_key: &str) -> Result<Vec<f32>>;

    /// Model identifier, e.g. `"text-embedding-004"`.
    fn model_name(&self) -> &str;
}

/// Cloud document-OCR provider, the highest-accuracy cascade stage.
#[async_trait]
pub trait DocumentOcr: Send + Sync {
    /// Runs dense document text detection over a PNG/JPEG payload.
    async fn annotate(&self, image: &[u8]) -> Result<String>;
}

/// Generative vision-language provider used as an OCR fallback.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn transcribe(&self, image: &[u8], instruction: &str) -> Result<String>;
}

/// One local OCR run.
#[derive(Debug, Clone)]
pub struct OcrAttempt {
    pub text: String,
    /// Engine-reported mean word confidence, 0..=100.
    pub confidence: f32,
}

/// Local OCR engine, the last cascade stage.
#[async_trait]
pub trait LocalOcr: Send + Sync {
    async fn recognize(&self, image: &[u8], languages: &str, psm: u32) -> Result<OcrAttempt>;
}

/// Sniffs the payload MIME type for provider request bodies.
pub fn image_mime_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else {
        "image/jpeg"
    }
}
