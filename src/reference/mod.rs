//! Per-industry reference embedding libraries
//!
//! Each supported industry has a pre-generated JSON index of reference
//! profile embeddings. Indices are fetched at most once per process; a
//! failed fetch is remembered as "no baseline available" and not retried
//! in-process, so callers always get a fast answer.

use crate::config::ReferenceConfig;
use crate::error::{Result, ScreenerError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    It,
    Sales,
    Marketing,
    Design,
}

impl Industry {
    pub const ALL: [Industry; 4] = [
        Industry::It,
        Industry::Sales,
        Industry::Marketing,
        Industry::Design,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::It => "it",
            Industry::Sales => "sales",
            Industry::Marketing => "marketing",
            Industry::Design => "design",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Industry {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "it" => Ok(Industry::It),
            "sales" => Ok(Industry::Sales),
            "marketing" => Ok(Industry::Marketing),
            "design" => Ok(Industry::Design),
            other => Err(ScreenerError::InvalidInput(format!(
                "unknown industry: {}",
                other
            ))),
        }
    }
}

/// One precomputed reference profile, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    pub id: String,
    pub relative_path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub summary_snippet: Option<String>,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceIndex {
    pub generated_at: String,
    pub model: String,
    pub vector_length: usize,
    pub record_count: usize,
    pub data_root: String,
    pub records: Vec<ReferenceRecord>,
}

/// Observable load state of one industry's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotAttempted,
    Loaded,
    Failed,
}

/// Lazily loads and memoizes reference indices. Concurrent first callers
/// for the same industry share one fetch via the per-industry cell.
pub struct ReferenceLibrary {
    settings: ReferenceConfig,
    client: reqwest::Client,
    cells: HashMap<Industry, OnceCell<Option<Arc<ReferenceIndex>>>>,
}

impl ReferenceLibrary {
    pub fn new(settings: ReferenceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        let cells = Industry::ALL
            .iter()
            .map(|&industry| (industry, OnceCell::new()))
            .collect();
        Self {
            settings,
            client,
            cells,
        }
    }

    /// Returns the index for `industry`, fetching it on first use. All
    /// failure modes resolve to `None` ("no baseline available"), never an
    /// error, and stay `None` for the process lifetime.
    pub async fn load(&self, industry: Industry) -> Option<Arc<ReferenceIndex>> {
        let cell = self.cells.get(&industry)?;
        cell.get_or_init(|| async {
            match self.fetch(industry).await {
                Ok(index) => {
                    log::info!(
                        "loaded {} reference index: {} records, {} dims",
                        industry,
                        index.records.len(),
                        index.vector_length
                    );
                    Some(Arc::new(index))
                }
                Err(e) => {
                    warn!("reference index for {} unavailable: {}", industry, e);
                    None
                }
            }
        })
        .await
        .clone()
    }

    /// Load state for observability and tests.
    pub fn state(&self, industry: Industry) -> LoadState {
        match self.cells.get(&industry).and_then(|c| c.get()) {
            None => LoadState::NotAttempted,
            Some(Some(_)) => LoadState::Loaded,
            Some(None) => LoadState::Failed,
        }
    }

    async fn fetch(&self, industry: Industry) -> Result<ReferenceIndex> {
        if let Some(dir) = &self.settings.dir {
            let path = dir.join(format!("{}.json", industry));
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                ScreenerError::ReferenceIndex(format!("{}: {}", path.display(), e))
            })?;
            return serde_json::from_str(&content)
                .map_err(|e| ScreenerError::ReferenceIndex(format!("{}: {}", path.display(), e)));
        }

        if let Some(base) = &self.settings.base_url {
            let url = format!("{}/{}.json", base.trim_end_matches('/'), industry);
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ScreenerError::ReferenceIndex(format!(
                    "{} returned {}",
                    url, status
                )));
            }
            return response
                .json::<ReferenceIndex>()
                .await
                .map_err(|e| ScreenerError::ReferenceIndex(format!("{}: {}", url, e)));
        }

        Err(ScreenerError::ReferenceIndex(
            "no reference source configured".to_string(),
        ))
    }
}
