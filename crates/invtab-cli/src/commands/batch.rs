//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use invtab_core::{Extraction, InvoicePipeline};

use super::output::{self, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input files
    #[arg(required = true)]
    input: String,

    /// Output directory (one file per input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of documents processed in parallel
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Use only the embedded text layer, never OCR
    #[arg(long)]
    no_ocr: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    outcome: Result<Extraction, String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::config::load(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }
    if args.format == OutputFormat::Xlsx && args.output_dir.is_none() {
        anyhow::bail!("xlsx output needs a directory; pass --output-dir");
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = Arc::new(super::process::build_pipeline(&config, args.no_ocr)?);
    let jobs = args.jobs.max(1);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let results = process_all(files, pipeline, jobs, &pb, !args.continue_on_error).await;
    pb.finish_and_clear();
    let results = results?;

    let mut successful = 0usize;
    for result in &results {
        match &result.outcome {
            Ok(extraction) => {
                successful += 1;
                for warning in extraction.warnings() {
                    warn!("{}: {}", result.path.display(), warning);
                }
                if extraction.is_empty() {
                    warn!("{}: no table data detected", result.path.display());
                }
                if let Some(output_dir) = &args.output_dir {
                    let output_path = output_path(output_dir, &result.path, args.format);
                    output::write_file(extraction, args.format, &output_path)?;
                    debug!("Wrote output to {}", output_path.display());
                }
            }
            Err(message) => warn!("Failed to process {}: {}", result.path.display(), message),
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed = results.len() - successful;

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed).red()
    );

    if failed > 0 {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &results {
            if let Err(message) = &result.outcome {
                eprintln!("  - {}: {}", result.path.display(), message);
            }
        }
    }

    Ok(())
}

/// Run the pipeline over `files`, up to `jobs` at a time, keeping input order.
///
/// With `fail_fast`, the first failure in input order ends the run and no
/// further documents are started.
async fn process_all(
    files: Vec<PathBuf>,
    pipeline: Arc<InvoicePipeline>,
    jobs: usize,
    pb: &ProgressBar,
    fail_fast: bool,
) -> anyhow::Result<Vec<ProcessResult>> {
    let results = stream::iter(files)
        .map(|path| {
            let pipeline = Arc::clone(&pipeline);
            let pb = pb.clone();
            async move {
                let task_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || pipeline.extract_path(&task_path))
                    .await
                    .map_err(|e| e.to_string())
                    .and_then(|r| r.map_err(|e| e.to_string()));
                pb.inc(1);
                ProcessResult { path, outcome }
            }
        })
        .buffered(jobs);

    if !fail_fast {
        return Ok(results.collect().await);
    }

    results
        .map(|result| {
            if let Err(message) = &result.outcome {
                error!("Failed to process {}: {}", result.path.display(), message);
                anyhow::bail!("Processing failed for {}: {}", result.path.display(), message);
            }
            Ok(result)
        })
        .try_collect()
        .await
}

fn output_path(output_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");
    output_dir.join(format!("{}.{}", stem, format.extension()))
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "source",
        "rows",
        "grand_total",
        "warnings",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &result.outcome {
            Ok(extraction) => {
                let source = serde_json::to_value(extraction.source)?;
                wtr.write_record([
                    filename,
                    "success",
                    source.as_str().unwrap_or_default(),
                    &extraction.table.len().to_string(),
                    &extraction.table.grand_total().to_string(),
                    &extraction.warnings().len().to_string(),
                    &extraction.processing_time_ms.to_string(),
                    "",
                ])?;
            }
            Err(message) => {
                wtr.write_record([filename, "error", "", "", "", "", "", message.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
