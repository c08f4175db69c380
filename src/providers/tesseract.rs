//! Local OCR via the tesseract CLI
//!
//! Runs tesseract with TSV output so the engine-reported word confidences
//! are available to the cascade's attempt selection.

use crate::error::{Result, ScreenerError};
use crate::providers::{LocalOcr, OcrAttempt};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

pub struct TesseractCli {
    binary: String,
}

impl TesseractCli {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    fn scratch_path() -> PathBuf {
        let unique = format!(
            "cv-screener-ocr-{}-{}.png",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        );
        std::env::temp_dir().join(unique)
    }
}

#[async_trait]
impl LocalOcr for TesseractCli {
    async fn recognize(&self, image: &[u8], languages: &str, psm: u32) -> Result<OcrAttempt> {
        let input = Self::scratch_path();
        tokio::fs::write(&input, image).await?;

        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(languages)
            .arg("--psm")
            .arg(psm.to_string())
            .arg("tsv")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let _ = tokio::fs::remove_file(&input).await;

        let output = output.map_err(|e| {
            ScreenerError::Ocr(format!("failed to run {}: {}", self.binary, e))
        })?;

        if !output.status.success() {
            return Err(ScreenerError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Builds the recognized text and mean word confidence from tesseract TSV.
///
/// TSV columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Word rows have level 5 and a
/// non-negative confidence.
fn parse_tsv(tsv: &str) -> OcrAttempt {
    let mut text = String::new();
    let mut confidences: Vec<f32> = Vec::new();
    let mut current_line: Option<(String, String, String)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let word = cols[11].trim();
        if conf < 0.0 || word.is_empty() {
            continue;
        }
        confidences.push(conf);

        // line_num restarts per paragraph, so the key needs par_num too.
        let line_key = (
            cols[2].to_string(),
            cols[3].to_string(),
            cols[4].to_string(),
        );
        match &current_line {
            Some(key) if *key == line_key => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some(line_key);
        text.push_str(word);
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    OcrAttempt { text, confidence }
}
