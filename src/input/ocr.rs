//! OCR fallback chain for rasterized pages and uploaded images
//!
//! Strict priority order: cloud document OCR, then a generative vision
//! model, then local OCR. The first stage whose trimmed output clears the
//! "good" threshold wins; anything a stage throws is logged and treated as
//! an empty result, so the cascade always returns its best attempt.

use crate::providers::{DocumentOcr, LocalOcr, OcrAttempt, VisionModel};
use log::warn;
use std::sync::Arc;

/// Instruction sent to the vision model. Asks for a faithful transcript and
/// repair of OCR-shaped damage (split syllables, broken diacritics) without
/// inventing content.
pub const TRANSCRIBE_INSTRUCTION: &str = "Transcribe all text in this document image exactly as \
written, top to bottom, preserving line structure. Rejoin syllables split across line breaks and \
repair obviously damaged Vietnamese diacritics, but do not add, summarize, or reorder anything. \
Return only the transcribed text.";

/// Page segmentation modes for the two local OCR attempts: a column-aware
/// document mode first, then the generic fallback.
const PSM_DOCUMENT: u32 = 4;
const PSM_GENERIC: u32 = 3;

/// Local output below this confidence triggers the final vision retry.
const LOW_CONFIDENCE: f32 = 60.0;

#[derive(Clone)]
pub struct VisionCascade {
    document_ocr: Option<Arc<dyn DocumentOcr>>,
    vision_model: Option<Arc<dyn VisionModel>>,
    local_ocr: Option<Arc<dyn LocalOcr>>,
    good_chars: usize,
    languages: String,
}

impl VisionCascade {
    pub fn new(
        document_ocr: Option<Arc<dyn DocumentOcr>>,
        vision_model: Option<Arc<dyn VisionModel>>,
        local_ocr: Option<Arc<dyn LocalOcr>>,
        good_chars: usize,
        languages: &str,
    ) -> Self {
        Self {
            document_ocr,
            vision_model,
            local_ocr,
            good_chars,
            languages: languages.to_string(),
        }
    }

    /// Runs the chain over one enhanced page image. Never fails; a fully
    /// exhausted cascade returns its best attempt, possibly empty.
    pub async fn recognize(&self, image: &[u8], progress: &mut (dyn FnMut(&str) + Send)) -> String {
        let mut best = String::new();

        if let Some(provider) = &self.document_ocr {
            progress("Reading page with cloud document OCR...");
            match provider.annotate(image).await {
                Ok(text) => {
                    if self.is_good(&text) {
                        return text;
                    }
                    keep_longer(&mut best, text);
                }
                Err(e) => warn!("cloud document OCR failed: {}", e),
            }
        }

        if let Some(model) = &self.vision_model {
            progress("Transcribing page with vision model...");
            match model.transcribe(image, TRANSCRIBE_INSTRUCTION).await {
                Ok(text) => {
                    if self.is_good(&text) {
                        return text;
                    }
                    keep_longer(&mut best, text);
                }
                Err(e) => warn!("vision transcription failed: {}", e),
            }
        }

        if let Some(engine) = &self.local_ocr {
            progress("Running local OCR...");
            if let Some(attempt) = self.best_local_attempt(engine.as_ref(), image).await {
                let short = attempt.text.trim().chars().count() <= self.good_chars;
                let low_confidence = attempt.confidence < LOW_CONFIDENCE;
                keep_longer(&mut best, attempt.text);

                if (short || low_confidence) && self.vision_model.is_some() {
                    progress("Local OCR weak, retrying vision model...");
                    if let Some(model) = &self.vision_model {
                        match model.transcribe(image, TRANSCRIBE_INSTRUCTION).await {
                            Ok(text) => keep_longer(&mut best, text),
                            Err(e) => warn!("vision retry failed: {}", e),
                        }
                    }
                }
            }
        }

        best
    }

    fn is_good(&self, text: &str) -> bool {
        text.trim().chars().count() > self.good_chars
    }

    /// Two configuration attempts, preferring the higher confidence unless
    /// its text is drastically shorter than the other attempt's.
    async fn best_local_attempt(&self, engine: &dyn LocalOcr, image: &[u8]) -> Option<OcrAttempt> {
        let mut attempts = Vec::new();
        for psm in [PSM_DOCUMENT, PSM_GENERIC] {
            match engine.recognize(image, &self.languages, psm).await {
                Ok(attempt) => attempts.push(attempt),
                Err(e) => warn!("local OCR psm {} failed: {}", psm, e),
            }
        }
        pick_local_attempt(attempts)
    }
}

/// Selection rule for the two local attempts: higher confidence wins, but an
/// attempt shorter than half the other's length is rejected regardless.
pub(crate) fn pick_local_attempt(mut attempts: Vec<OcrAttempt>) -> Option<OcrAttempt> {
    match attempts.len() {
        0 => None,
        1 => attempts.pop(),
        _ => {
            let second = attempts.pop().unwrap_or(OcrAttempt {
                text: String::new(),
                confidence: 0.0,
            });
            let first = attempts.pop().unwrap_or(OcrAttempt {
                text: String::new(),
                confidence: 0.0,
            });
            let (hi, lo) = if first.confidence >= second.confidence {
                (first, second)
            } else {
                (second, first)
            };
            if hi.text.trim().chars().count() * 2 < lo.text.trim().chars().count() {
                Some(lo)
            } else {
                Some(hi)
            }
        }
    }
}

fn keep_longer(best: &mut String, candidate: String) {
    if candidate.trim().chars().count() > best.trim().chars().count() {
        *best = candidate;
    }
}
