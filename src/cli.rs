//! CLI interface for the CV screener

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cv-screener")]
#[command(about = "Batch CV screening with OCR extraction and industry similarity scoring")]
#[command(
    long_about = "Extract text from CVs (PDF, DOCX, images), detect an industry, and score each candidate against a curated reference-embedding library"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Screen one or more CV files
    Screen {
        /// CV files to screen (PDF, DOCX, PNG, JPG, TXT)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to the job description file, shown alongside results
        #[arg(short, long)]
        job: Option<PathBuf>,

        /// Force a specific industry instead of detecting one
        #[arg(short, long)]
        industry: Option<String>,

        /// Re-run OCR even when a cached or text-layer result exists
        #[arg(long)]
        force_ocr: bool,

        /// Maximum number of CVs processed concurrently
        #[arg(short = 'n', long, default_value = "4")]
        jobs: usize,

        /// Output format: console, json
        #[arg(short, long, default_value = "console")]
        output: String,

        /// Save results to a file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Extract text from a single file and print it
    Extract {
        /// File to extract (PDF, DOCX, PNG, JPG, TXT)
        file: PathBuf,

        /// Re-run OCR even when a cached or text-layer result exists
        #[arg(long)]
        force_ocr: bool,
    },

    /// Show or reset configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Json,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json",
            format
        )),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &PathBuf, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}
