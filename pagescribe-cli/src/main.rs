use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::Path;

// Import from pagescribe-core
use pagescribe_core::{
    discover, BatchReport, ConfigSource, DocumentProcessor, DocumentStatus, FailurePolicy,
    PipelineConfig,
};

use pagescribe::init_logging;

#[derive(Parser)]
#[command(name = "pagescribe")]
#[command(about = "Turn PDFs into page-ordered text transcripts using cached Textract layout analysis")]
struct Args {
    /// PDF file, directory of PDFs, or glob pattern (default: ./data/*.pdf)
    input: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// AWS region for Textract (overrides config and AWS_REGION)
    #[arg(long)]
    region: Option<String>,

    /// Neither read nor write cached Textract output (always calls the service)
    #[arg(long)]
    skip_cache: bool,

    /// Stop the batch at the first failed document
    #[arg(long)]
    fail_fast: bool,

    /// Write a JSON report of the batch to this path
    #[arg(long)]
    report: Option<String>,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Render titles, headers, lists and tables with markdown markup
    #[arg(long)]
    markdown: bool,

    /// Leave text inside figures out of the transcript
    #[arg(long)]
    exclude_figures: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Less log output (-q warn, -qq error)
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    println!("🦀 Pagescribe PDF Transcriber");

    // Load config, then let flags win
    let (mut config, source) = PipelineConfig::load_with_fallback(args.config.as_deref());
    println!("{}", config_status(&source));
    apply_overrides(&mut config, &args);
    config.validate()?;

    let inputs = discover(&config.input)?;
    if inputs.is_empty() {
        println!("⚠️  No PDF files matched: {}", config.input);
        return Ok(());
    }
    println!("📄 Found {} document(s) in {}", inputs.len(), config.input);

    let mut processor = create_processor(&config)?.with_profiling(args.profile);
    let report = processor.process_batch(&inputs);

    print_report(&report);

    if let Some(report_path) = &args.report {
        report
            .save(Path::new(report_path))
            .with_context(|| format!("failed to write batch report to {report_path}"))?;
        println!("💾 Batch report saved to: {}", report_path);
    }

    if args.profile {
        processor.profiler().print_summary();
    }

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn config_status(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Defaults => "📋 Using default config".to_string(),
        ConfigSource::File(path) => format!("📋 Loaded config from: {}", path),
        ConfigSource::Fallback { path, reason } => {
            format!("⚠️  Could not load config {}: {}\n📋 Using default config", path, reason)
        }
    }
}

fn apply_overrides(config: &mut PipelineConfig, args: &Args) {
    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(region) = &args.region {
        config.analyzer.region = Some(region.clone());
    }
    if args.skip_cache {
        config.skip_cache = true;
    }
    if args.fail_fast {
        config.on_error = FailurePolicy::Abort;
    }
    if args.markdown {
        config.render.generate_markdown = true;
    }
    if args.exclude_figures {
        config.render.exclude_figure_text = true;
    }
}

/// Create DocumentProcessor with the Textract backend
#[cfg(feature = "textract-backend")]
fn create_processor(config: &PipelineConfig) -> Result<DocumentProcessor> {
    println!("🚀 Using Textract backend ({})", config.analyzer.resolve_region());
    DocumentProcessor::from_config(config)
}

/// Fallback when no backend is compiled in
#[cfg(not(feature = "textract-backend"))]
fn create_processor(_config: &PipelineConfig) -> Result<DocumentProcessor> {
    Err(anyhow::anyhow!(
        "No analysis backend compiled in!\n\
         Compile with: --features textract-backend"
    ))
}

fn print_report(report: &BatchReport) {
    for document in &report.documents {
        match &document.status {
            DocumentStatus::Succeeded {
                cache_hit,
                pages,
                transcript,
                ..
            } => {
                let source = if *cache_hit { "cached" } else { "analyzed" };
                println!(
                    "✅ {} → {} ({} page(s), {})",
                    document.input.display(),
                    transcript.display(),
                    pages,
                    source
                );
            }
            DocumentStatus::Failed { stage, kind, error } => {
                println!(
                    "❌ {} failed in {} stage [{}]: {}",
                    document.input.display(),
                    stage,
                    kind,
                    error
                );
            }
            DocumentStatus::Skipped => {
                println!("⏭️  {} skipped", document.input.display());
            }
        }
    }

    println!("📊 Batch summary:");
    println!("   - Succeeded: {} ({} from cache)", report.succeeded(), report.cache_hits());
    println!("   - Failed: {}", report.failed());
    if report.policy == FailurePolicy::Abort {
        println!("   - Skipped: {}", report.skipped());
    }
}
