//! Per-candidate analysis orchestration

pub mod candidate;
pub mod industry;
pub mod pipeline;

pub use candidate::{apply_similarity_bonus, Candidate, ScoreDetail};
pub use industry::{detect_industry, IndustryDetector};
pub use pipeline::{ScreeningFailure, ScreeningOutcome, ScreeningPipeline};
