//! Embedding-similarity scoring

pub mod engine;
pub mod similarity;

pub use engine::SimilarityEngine;
pub use similarity::{IndustryInsight, SimilarityMatch};
