//! Round-robin API credential pool
//!
//! Replaces a module-global rotation index with an injected object so
//! rotation order is deterministic and testable. Rotation is a best-effort
//! load-spreading heuristic; concurrent failures may advance the cursor past
//! the intended next key, which is tolerated.

use std::sync::atomic::{AtomicUsize, Ordering};

pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Builds a pool from a comma-separated environment variable. A missing
    /// or empty variable yields an empty pool, not an error.
    pub fn from_env(var: &str) -> Self {
        let keys = std::env::var(var)
            .map(|v| v.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        Self::new(keys)
    }

    /// Returns the next credential and its index, advancing the cursor.
    pub fn next(&self) -> Option<(usize, String)> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some((idx, self.keys[idx].clone()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
