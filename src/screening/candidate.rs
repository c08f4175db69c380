//! Candidate result record and bonus merging
//!
//! The similarity bonus is an optional enhancement on top of an externally
//! produced score breakdown. It is merged at most once per candidate and the
//! merge leaves an auditable trail in the detail list.

use crate::reference::Industry;
use crate::scoring::IndustryInsight;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Grapheme clusters kept in the stored text preview.
const PREVIEW_GRAPHEMES: usize = 280;

/// One line of the candidate's score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub criterion: String,
    pub points: f32,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub file_name: String,
    pub industry: Option<Industry>,
    pub score: f32,
    pub details: Vec<ScoreDetail>,
    pub embedding_insights: Option<IndustryInsight>,
    pub text_preview: String,
    pub screened_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(id: &str, file_name: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            file_name: file_name.to_string(),
            industry: None,
            score: 0.0,
            details: Vec::new(),
            embedding_insights: None,
            text_preview: preview(text),
            screened_at: Utc::now(),
        }
    }
}

fn preview(text: &str) -> String {
    text.graphemes(true).take(PREVIEW_GRAPHEMES).collect()
}

/// Merges a similarity insight into the candidate's score.
///
/// No-op when insights are already attached, so repeated calls cannot
/// double-count the bonus. The applied points are clamped so the total
/// never exceeds `ceiling`, and an explanatory entry is prepended to the
/// detail list.
pub fn apply_similarity_bonus(candidate: &mut Candidate, insight: IndustryInsight, ceiling: f32) {
    if candidate.embedding_insights.is_some() {
        return;
    }

    let applied = insight
        .bonus_points
        .min(ceiling - candidate.score)
        .max(0.0);
    candidate.score += applied;

    let cited: Vec<String> = insight
        .top_matches
        .iter()
        .map(|m| {
            let name = m.name.as_deref().unwrap_or(m.id.as_str());
            match m.role.as_deref() {
                Some(role) => format!("{} ({}, {:.0}%)", name, role, m.similarity * 100.0),
                None => format!("{} ({:.0}%)", name, m.similarity * 100.0),
            }
        })
        .collect();
    candidate.details.insert(
        0,
        ScoreDetail {
            criterion: format!("Industry profile similarity ({})", insight.industry),
            points: applied,
            evidence: format!(
                "Average similarity {:.0}% against top reference profiles: {}",
                insight.average_similarity * 100.0,
                cited.join(", ")
            ),
        },
    );
    candidate.embedding_insights = Some(insight);
}
