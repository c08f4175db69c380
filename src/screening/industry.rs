//! Keyword-based industry detection
//!
//! A lightweight classifier used only to pick which reference library to
//! compare against. It counts lexicon hits per industry with a shared
//! Aho-Corasick automaton and requires a minimum number of hits before
//! committing to an answer.

use crate::error::{Result, ScreenerError};
use crate::reference::Industry;
use aho_corasick::{AhoCorasick, MatchKind};

const IT_KEYWORDS: &[&str] = &[
    "software engineer",
    "developer",
    "backend",
    "frontend",
    "full-stack",
    "fullstack",
    "react",
    "node.js",
    "python",
    "java",
    "golang",
    "database",
    "devops",
    "kubernetes",
    "microservices",
    "rest api",
    "lập trình",
    "phần mềm",
];

const SALES_KEYWORDS: &[&str] = &[
    "sales",
    "revenue",
    "quota",
    "crm",
    "account executive",
    "business development",
    "negotiation",
    "b2b",
    "b2c",
    "upsell",
    "cold calling",
    "kinh doanh",
    "bán hàng",
];

const MARKETING_KEYWORDS: &[&str] = &[
    "marketing",
    "seo",
    "sem",
    "campaign",
    "brand awareness",
    "content strategy",
    "social media",
    "google ads",
    "facebook ads",
    "copywriting",
    "influencer",
    "truyền thông",
    "tiếp thị",
];

const DESIGN_KEYWORDS: &[&str] = &[
    "graphic design",
    "ui/ux",
    "user interface",
    "user experience",
    "figma",
    "photoshop",
    "illustrator",
    "typography",
    "wireframe",
    "prototyping",
    "art director",
    "thiết kế",
];

pub struct IndustryDetector {
    matcher: AhoCorasick,
    // pattern index -> owning industry
    owners: Vec<Industry>,
}

impl IndustryDetector {
    pub fn new() -> Result<Self> {
        let groups = [
            (Industry::It, IT_KEYWORDS),
            (Industry::Sales, SALES_KEYWORDS),
            (Industry::Marketing, MARKETING_KEYWORDS),
            (Industry::Design, DESIGN_KEYWORDS),
        ];
        let mut patterns = Vec::new();
        let mut owners = Vec::new();
        for (industry, keywords) in groups {
            for keyword in keywords {
                patterns.push(*keyword);
                owners.push(industry);
            }
        }
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|e| {
                ScreenerError::Processing(format!("failed to build industry matcher: {}", e))
            })?;
        Ok(Self { matcher, owners })
    }

    /// Picks the industry whose lexicon matches the text most often.
    ///
    /// Fewer than `min_hits` matches for the winner yields `None`. Ties are
    /// broken by the declaration order of `Industry::ALL`, which keeps batch
    /// results deterministic.
    pub fn detect(&self, text: &str, min_hits: usize) -> Option<Industry> {
        let mut hits = [0usize; Industry::ALL.len()];

        for m in self.matcher.find_iter(text) {
            // Reject matches embedded inside a longer word ("javanese" must
            // not count as "java").
            if !word_bounded(text, m.start(), m.end()) {
                continue;
            }
            let industry = self.owners[m.pattern().as_usize()];
            if let Some(slot) = Industry::ALL.iter().position(|i| *i == industry) {
                hits[slot] += 1;
            }
        }

        let mut best: Option<(Industry, usize)> = None;
        for (industry, count) in Industry::ALL.iter().zip(hits.iter()) {
            // Strict comparison keeps the earliest industry on a tie.
            if best.map(|(_, c)| *count > c).unwrap_or(true) {
                best = Some((*industry, *count));
            }
        }
        best.filter(|(_, count)| *count >= min_hits).map(|(i, _)| i)
    }
}

fn word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before_clean = text[..start]
        .chars()
        .next_back()
        .map(|c| !c.is_alphanumeric())
        .unwrap_or(true);
    let after_clean = text[end..]
        .chars()
        .next()
        .map(|c| !c.is_alphanumeric())
        .unwrap_or(true);
    before_clean && after_clean
}

/// Convenience wrapper used by tests and one-shot callers.
pub fn detect_industry(text: &str, min_hits: usize) -> Option<Industry> {
    IndustryDetector::new().ok()?.detect(text, min_hits)
}
