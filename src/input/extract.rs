//! Layered text extraction
//!
//! Dispatches on file kind, prefers cheap accurate paths (PDF text layer,
//! DOCX XML, plain text) and falls back to page rasterization plus the OCR
//! cascade only when needed. Results are normalized and cached under the
//! file fingerprint.

use crate::cache::{TtlCache, DEFAULT_SCHEMA_VERSION};
use crate::config::ExtractionConfig;
use crate::error::{Result, ScreenerError};
use crate::input::docx::extract_docx_text;
use crate::input::enhance::preprocess_image_bytes;
use crate::input::file_detector::FileKind;
use crate::input::normalize::clean_extracted_text;
use crate::input::ocr::VisionCascade;
use crate::input::source::SourceFile;
use async_trait::async_trait;
use log::warn;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;

/// Characters of text layer inspected per probed page.
const PROBE_CHARS_PER_PAGE: usize = 2000;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Skip the cache read and the born-digital shortcut; used as a
    /// targeted retry when the first-pass result was unusable downstream.
    pub force_ocr: bool,
}

/// Renders PDF pages to PNG images for the OCR path.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &[u8], max_pages: usize, dpi: u32) -> Result<Vec<Vec<u8>>>;
}

/// Rasterizer backed by the poppler `pdftoppm` binary.
pub struct PdftoppmRasterizer {
    binary: String,
}

impl PdftoppmRasterizer {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "cv-screener-raster-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ))
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &[u8], max_pages: usize, dpi: u32) -> Result<Vec<Vec<u8>>> {
        let dir = Self::scratch_dir();
        tokio::fs::create_dir_all(&dir).await?;
        let input = dir.join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        let result = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(max_pages.to_string())
            .arg(&input)
            .arg(dir.join("page"))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let pages = match result {
            Ok(output) if output.status.success() => {
                let mut names: Vec<PathBuf> = std::fs::read_dir(&dir)?
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
                    .collect();
                names.sort();
                let mut pages = Vec::with_capacity(names.len());
                for name in names {
                    pages.push(tokio::fs::read(&name).await?);
                }
                Ok(pages)
            }
            Ok(output) => Err(ScreenerError::PdfExtraction(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) => Err(ScreenerError::PdfExtraction(format!(
                "failed to run {}: {}",
                self.binary, e
            ))),
        };

        let _ = tokio::fs::remove_dir_all(&dir).await;
        pages
    }
}

/// Route chosen for a PDF after probing its text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfRoute {
    TextLayer,
    Ocr,
}

/// Born-digital check: enough alphanumeric content in the first few pages
/// of the text layer, and no forced OCR.
pub fn decide_pdf_route(
    layer: Option<&str>,
    force_ocr: bool,
    probe_pages: usize,
    min_chars: usize,
) -> PdfRoute {
    if force_ocr {
        return PdfRoute::Ocr;
    }
    let Some(text) = layer else {
        return PdfRoute::Ocr;
    };
    let window: String = text.chars().take(probe_pages * PROBE_CHARS_PER_PAGE).collect();
    let alphanumeric = window.chars().filter(|c| c.is_alphanumeric()).count();
    if alphanumeric >= min_chars {
        PdfRoute::TextLayer
    } else {
        PdfRoute::Ocr
    }
}

pub struct TextExtractionPipeline {
    settings: ExtractionConfig,
    cascade: VisionCascade,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    cache: Arc<Mutex<TtlCache<String>>>,
}

impl TextExtractionPipeline {
    pub fn new(
        settings: ExtractionConfig,
        cascade: VisionCascade,
        rasterizer: Option<Arc<dyn PageRasterizer>>,
        cache: Arc<Mutex<TtlCache<String>>>,
    ) -> Self {
        Self {
            settings,
            cascade,
            rasterizer,
            cache,
        }
    }

    /// Extracts normalized plain text from an uploaded document.
    ///
    /// Throws only for structural problems (oversize file, unsupported
    /// format, no extraction path left). Quality problems degrade to a
    /// short or empty string instead.
    pub async fn extract_text(
        &self,
        file: &SourceFile,
        progress: &mut (dyn FnMut(&str) + Send),
        opts: &ExtractOptions,
    ) -> Result<String> {
        let limit = self.settings.max_file_size_mb * 1024 * 1024;
        if file.stamp.size > limit {
            return Err(ScreenerError::FileTooLarge {
                name: file.stamp.name.clone(),
                size: file.stamp.size,
                limit,
            });
        }
        if file.kind == FileKind::Unknown {
            return Err(ScreenerError::UnsupportedFormat(file.stamp.name.clone()));
        }

        if !opts.force_ocr {
            // A task that panicked mid-insert leaves the cache usable;
            // recover the guard instead of cascading the panic.
            let hit = self
                .cache
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .get(&file.stamp, DEFAULT_SCHEMA_VERSION);
            if let Some(text) = hit {
                progress("Using cached extraction");
                return Ok(text);
            }
        }

        let bytes = file.read_bytes().await?;
        let raw = match file.kind {
            FileKind::Pdf => self.extract_pdf(&bytes, opts.force_ocr, progress).await?,
            FileKind::Docx => {
                progress("Extracting DOCX text...");
                extract_docx_text(&bytes)?
            }
            FileKind::Png | FileKind::Jpeg => {
                progress("Preparing image for OCR...");
                let enhanced = preprocess_image_bytes(&bytes, self.settings.max_image_edge)?;
                self.cascade.recognize(&enhanced, progress).await
            }
            FileKind::Text => String::from_utf8_lossy(&bytes).into_owned(),
            FileKind::Unknown => unreachable!("rejected above"),
        };

        let cleaned = clean_extracted_text(&raw);
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .set(&file.stamp, cleaned.clone(), DEFAULT_SCHEMA_VERSION);
        Ok(cleaned)
    }

    async fn extract_pdf(
        &self,
        bytes: &[u8],
        force_ocr: bool,
        progress: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String> {
        progress("Reading PDF text layer...");
        let layer = match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("PDF text layer unreadable: {}", e);
                None
            }
        };

        let route = decide_pdf_route(
            layer.as_deref(),
            force_ocr,
            self.settings.pdf_probe_pages,
            self.settings.min_text_layer_chars,
        );
        if route == PdfRoute::TextLayer {
            // decide_pdf_route only picks the text layer when it exists
            return Ok(layer.unwrap_or_default());
        }

        let Some(rasterizer) = &self.rasterizer else {
            return layer
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| {
                    ScreenerError::PdfExtraction(
                        "PDF has no usable text layer and no rasterizer is configured".to_string(),
                    )
                });
        };

        progress("Rasterizing scanned PDF pages...");
        let pages = rasterizer
            .rasterize(bytes, self.settings.max_ocr_pages, self.settings.render_dpi)
            .await?;

        let total = pages.len();
        let mut parts = Vec::with_capacity(total);
        for (index, page) in pages.iter().enumerate() {
            progress(&format!("Running OCR on page {}/{}...", index + 1, total));
            let enhanced = preprocess_image_bytes(page, self.settings.max_image_edge)?;
            parts.push(self.cascade.recognize(&enhanced, progress).await);
        }
        Ok(parts.join("\n\n"))
    }
}
