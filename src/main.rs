//! CV screener: batch CV screening with OCR extraction and industry similarity scoring

use clap::Parser;
use colored::Colorize;
use cv_screener::cache::TtlCache;
use cv_screener::cli::{self, Cli, Commands, ConfigAction, OutputFormat};
use cv_screener::config::Config;
use cv_screener::error::{Result, ScreenerError};
use cv_screener::input::extract::{PageRasterizer, PdftoppmRasterizer};
use cv_screener::input::ocr::VisionCascade;
use cv_screener::input::{ExtractOptions, SourceFile, TextExtractionPipeline};
use cv_screener::providers::gemini::{GeminiEmbedder, GeminiVision};
use cv_screener::providers::tesseract::TesseractCli;
use cv_screener::providers::vision::CloudDocumentOcr;
use cv_screener::providers::{CredentialPool, DocumentOcr, LocalOcr, VisionModel};
use cv_screener::reference::{Industry, ReferenceLibrary};
use cv_screener::scoring::SimilarityEngine;
use cv_screener::screening::{ScreeningOutcome, ScreeningPipeline};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CV_EXTENSIONS: &[&str] = &["pdf", "docx", "png", "jpg", "jpeg", "txt"];

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    // Execute command
    if let Err(e) = run_command(cli.command, config).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Screen {
            files,
            job,
            industry,
            force_ocr,
            jobs,
            output,
            save,
        } => {
            info!("Starting CV screening for {} file(s)", files.len());

            for file in &files {
                cli::validate_file_extension(file, CV_EXTENSIONS)
                    .map_err(|e| ScreenerError::InvalidInput(format!("CV file: {}", e)))?;
            }
            if let Some(job) = &job {
                cli::validate_file_extension(job, CV_EXTENSIONS)
                    .map_err(|e| ScreenerError::InvalidInput(format!("Job description: {}", e)))?;
            }
            let industry_override = industry.map(|s| s.parse::<Industry>()).transpose()?;
            let output_format = parse_format(&output)?;

            let pipeline = build_pipeline(&config)?;

            if let Some(job) = &job {
                let jd_text = pipeline.extract_job_description(job).await?;
                println!("{} {}", "Job description:".bold(), job.display());
                println!("  {} characters extracted\n", jd_text.len());
            }

            let spinner = screening_spinner(files.len());
            let outcome = pipeline
                .screen_batch(&files, industry_override, jobs, ExtractOptions { force_ocr })
                .await;
            spinner.finish_and_clear();

            let rendered = match output_format {
                OutputFormat::Console => {
                    print_console(&outcome);
                    None
                }
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&outcome)?;
                    println!("{}", json);
                    Some(json)
                }
            };

            if let Some(path) = save {
                let body = match rendered {
                    Some(json) => json,
                    None => serde_json::to_string_pretty(&outcome)?,
                };
                std::fs::write(&path, body)?;
                println!("\nResults saved to {}", path.display());
            }
        }

        Commands::Extract { file, force_ocr } => {
            cli::validate_file_extension(&file, CV_EXTENSIONS)
                .map_err(|e| ScreenerError::InvalidInput(format!("Input file: {}", e)))?;

            let extractor = build_extractor(&config)?;
            let source = SourceFile::open(&file)?;

            let spinner = ProgressBar::new_spinner();
            spinner.enable_steady_tick(Duration::from_millis(120));
            let mut progress = |message: &str| spinner.set_message(message.to_string());
            let text = extractor
                .extract_text(&source, &mut progress, &ExtractOptions { force_ocr })
                .await?;
            spinner.finish_and_clear();

            println!("{}", text);
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("{}\n", "Current Configuration".bold());
                println!("CV cache TTL: {} h", config.caches.cv_ttl_hours);
                println!("JD cache TTL: {} h", config.caches.jd_ttl_hours);
                println!("Cache capacity: {} entries", config.caches.max_entries);
                println!("Max file size: {} MB", config.extraction.max_file_size_mb);
                println!("OCR languages: {}", config.extraction.ocr_languages);
                println!("Embedding model: {}", config.providers.embedding_model);
                println!("Vision model: {}", config.providers.vision_model);
                println!("\nBonus thresholds:");
                for threshold in &config.scoring.bonus_thresholds {
                    println!(
                        "  similarity >= {:.0}% -> +{} points",
                        threshold.min_similarity * 100.0,
                        threshold.points
                    );
                }
            }
            Some(ConfigAction::Reset) => {
                println!("Resetting configuration to defaults...");
                Config::default().save()?;
                println!("{}", "Configuration reset successfully".green());
            }
        },
    }

    Ok(())
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    cli::parse_output_format(format).map_err(ScreenerError::InvalidInput)
}

fn screening_spinner(total: usize) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Screening {} CV(s)...", total));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn print_console(outcome: &ScreeningOutcome) {
    println!("{}\n", "Screening Results".bold());
    for (rank, candidate) in outcome.candidates.iter().enumerate() {
        let score = format!("{:.1}", candidate.score);
        let score = if candidate.score > 0.0 {
            score.green()
        } else {
            score.normal()
        };
        let industry = candidate
            .industry
            .map(|i| i.to_string())
            .unwrap_or_else(|| "undetected".to_string());
        println!(
            "{}. {} [{}] {} points",
            rank + 1,
            candidate.file_name.bold(),
            industry,
            score
        );
        for detail in &candidate.details {
            println!("   +{:.1} {}: {}", detail.points, detail.criterion, detail.evidence);
        }
        if let Some(insight) = &candidate.embedding_insights {
            println!(
                "   average similarity {:.1}% across {} reference profile(s)",
                insight.average_similarity * 100.0,
                insight.top_matches.len()
            );
        }
    }

    if !outcome.failures.is_empty() {
        println!("\n{}", "Failures".bold().red());
        for failure in &outcome.failures {
            println!("  {} - {}", failure.file_name.red(), failure.reason);
        }
    }
}

fn build_cascade(config: &Config) -> Result<VisionCascade> {
    let providers = &config.providers;

    let document_ocr: Option<Arc<dyn DocumentOcr>> = match std::env::var(&providers.document_ocr_key_env)
    {
        Ok(key) if !key.trim().is_empty() && !providers.document_ocr_endpoint.is_empty() => {
            Some(Arc::new(CloudDocumentOcr::new(
                &providers.document_ocr_endpoint,
                key.trim(),
                providers.timeout_secs,
            )?))
        }
        _ => {
            info!("cloud document OCR disabled (no API key configured)");
            None
        }
    };

    let vision_pool = CredentialPool::from_env(&providers.vision_keys_env);
    let vision_model: Option<Arc<dyn VisionModel>> = if vision_pool.is_empty() {
        info!("vision transcription disabled (no API keys configured)");
        None
    } else {
        Some(Arc::new(GeminiVision::new(
            &providers.vision_endpoint,
            &providers.vision_model,
            vision_pool,
            providers.timeout_secs,
        )?))
    };

    let local_ocr: Option<Arc<dyn LocalOcr>> =
        Some(Arc::new(TesseractCli::new(&providers.tesseract_path)));

    Ok(VisionCascade::new(
        document_ocr,
        vision_model,
        local_ocr,
        config.extraction.good_ocr_chars,
        &config.extraction.ocr_languages,
    ))
}

fn build_extractor(config: &Config) -> Result<TextExtractionPipeline> {
    let cascade = build_cascade(config)?;
    let rasterizer: Option<Arc<dyn PageRasterizer>> = Some(Arc::new(PdftoppmRasterizer::new(
        &config.providers.pdftoppm_path,
    )));
    Ok(TextExtractionPipeline::new(
        config.extraction.clone(),
        cascade,
        rasterizer,
        Arc::new(Mutex::new(TtlCache::new(
            config.cv_ttl_ms(),
            config.caches.max_entries,
        ))),
    ))
}

fn build_pipeline(config: &Config) -> Result<Arc<ScreeningPipeline>> {
    let cascade = build_cascade(config)?;
    let rasterizer: Option<Arc<dyn PageRasterizer>> = Some(Arc::new(PdftoppmRasterizer::new(
        &config.providers.pdftoppm_path,
    )));

    let cv_extractor = TextExtractionPipeline::new(
        config.extraction.clone(),
        cascade.clone(),
        rasterizer.clone(),
        Arc::new(Mutex::new(TtlCache::new(
            config.cv_ttl_ms(),
            config.caches.max_entries,
        ))),
    );
    let jd_extractor = TextExtractionPipeline::new(
        config.extraction.clone(),
        cascade,
        rasterizer,
        Arc::new(Mutex::new(TtlCache::new(
            config.jd_ttl_ms(),
            config.caches.max_entries,
        ))),
    );

    let embedder = Arc::new(GeminiEmbedder::new(
        &config.providers.embedding_endpoint,
        &config.providers.embedding_model,
        config.providers.timeout_secs,
    )?);
    let embedding_pool = CredentialPool::from_env(&config.providers.embedding_keys_env);
    let library = Arc::new(ReferenceLibrary::new(config.reference.clone()));
    let engine = SimilarityEngine::new(
        config.scoring.clone(),
        embedder,
        embedding_pool,
        library,
    );

    Ok(Arc::new(ScreeningPipeline::new(
        cv_extractor,
        jd_extractor,
        engine,
        config.scoring.clone(),
    )?))
}
