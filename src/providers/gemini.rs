//! Generative-language API clients: text embeddings and vision transcription

use crate::error::{Result, ScreenerError};
use crate::providers::{image_mime_type, CredentialPool, Embedder, VisionModel};
use async_trait::async_trait;
use base64::Engine as _;
use log::warn;
use std::time::Duration;

/// Embedding client for the `models/{model}:embedContent` endpoint.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(endpoint: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn embed_url(&self) -> String {
        format!("{}/models/{}:embedContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str, api_key: &str) -> Result<Vec<f32>> {
        let url = self.embed_url();
        let body = serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [ { "text": text } ] },
        });

        // Key travels in a header so request URLs in error output stay
        // free of credentials.
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ScreenerError::Embedding(format!(
                "embedContent returned {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response.json().await?;
        let values = json
            .get("embedding")
            .and_then(|e| e.get("values"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ScreenerError::Embedding("embedContent response missing embedding.values".to_string())
            })?;

        Ok(values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Vision transcription client for `models/{model}:generateContent`.
///
/// Owns its own credential pool; transcription keys are rotated
/// independently of the embedding keys.
pub struct GeminiVision {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    pool: CredentialPool,
}

impl GeminiVision {
    pub fn new(
        endpoint: &str,
        model: &str,
        pool: CredentialPool,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            pool,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn transcribe_with_key(
        &self,
        image: &[u8],
        instruction: &str,
        api_key: &str,
    ) -> Result<String> {
        let url = self.generate_url();
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "contents": [ {
                "parts": [
                    { "text": instruction },
                    { "inline_data": { "mime_type": image_mime_type(image), "data": encoded } }
                ]
            } ]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ScreenerError::Ocr(format!(
                "generateContent returned {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response.json().await?;
        let parts = json
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                ScreenerError::Ocr("generateContent response missing candidate parts".to_string())
            })?;

        let text = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(text)
    }
}

#[async_trait]
impl VisionModel for GeminiVision {
    async fn transcribe(&self, image: &[u8], instruction: &str) -> Result<String> {
        let tries = self.pool.len().max(1);
        let mut last_err =
            ScreenerError::Ocr("no vision API credentials configured".to_string());

        for _ in 0..tries {
            let Some((idx, key)) = self.pool.next() else {
                break;
            };
            match self.transcribe_with_key(image, instruction, &key).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("vision transcription failed on credential #{}: {}", idx, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
