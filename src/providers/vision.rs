//! Cloud document-OCR client (`images:annotate` with dense text detection)

use crate::error::{Result, ScreenerError};
use crate::providers::DocumentOcr;
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

pub struct CloudDocumentOcr {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CloudDocumentOcr {
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn annotate_url(&self) -> String {
        format!("{}/images:annotate", self.endpoint)
    }
}

#[async_trait]
impl DocumentOcr for CloudDocumentOcr {
    async fn annotate(&self, image: &[u8]) -> Result<String> {
        let url = self.annotate_url();
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "requests": [ {
                "image": { "content": encoded },
                "features": [ { "type": "DOCUMENT_TEXT_DETECTION" } ]
            } ]
        });

        // Key in a header, not the URL; reqwest errors echo the URL.
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ScreenerError::Ocr(format!(
                "images:annotate returned {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = response.json().await?;
        if let Some(err) = json
            .get("responses")
            .and_then(|r| r.get(0))
            .and_then(|r| r.get("error"))
        {
            return Err(ScreenerError::Ocr(format!(
                "images:annotate error: {}",
                err.get("message").and_then(|m| m.as_str()).unwrap_or("unknown")
            )));
        }

        let text = json
            .get("responses")
            .and_then(|r| r.get(0))
            .and_then(|r| r.get("fullTextAnnotation"))
            .and_then(|a| a.get("text"))
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();
        Ok(text)
    }
}
