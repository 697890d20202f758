//! Process command - extract the line-item table from a single invoice.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invtab_core::{Extraction, InvoicePipeline, InvtabConfig, TextSource};

use super::output::{self, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or scanned image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Rasterization resolution for the OCR fallback
    #[arg(long)]
    dpi: Option<u32>,

    /// Use only the embedded text layer, never OCR
    #[arg(long)]
    no_ocr: bool,

    /// Print the raw acquired text to stderr
    #[arg(long)]
    show_text: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::config::load(config_path)?;
    if let Some(dpi) = args.dpi {
        config.pdf.render_dpi = dpi;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if args.format == OutputFormat::Xlsx && args.output.is_none() {
        anyhow::bail!("xlsx output needs a file; pass --output");
    }

    info!("Processing file: {}", args.input.display());

    let pipeline = build_pipeline(&config, args.no_ocr)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Extracting {}", args.input.display()));

    let input = args.input.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.extract_path(&input)).await?;
    pb.finish_and_clear();

    let extraction = result
        .map_err(|e| anyhow::anyhow!("Failed to process {}: {}", args.input.display(), e))?;

    if args.show_text {
        eprintln!("{}", style("Acquired text:").bold());
        eprintln!("{}", extraction.text);
        eprintln!();
    }

    report(&extraction);

    match &args.output {
        Some(output_path) => {
            output::write_file(&extraction, args.format, output_path)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        None => print!("{}", with_newline(output::render(&extraction, args.format)?)),
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Build a pipeline from `config`, optionally disabling the OCR tier.
pub fn build_pipeline(config: &InvtabConfig, no_ocr: bool) -> anyhow::Result<InvoicePipeline> {
    let pipeline = InvoicePipeline::from_config(config)?;
    if !no_ocr {
        debug!("OCR fallback engine: {}", pipeline.acquisition().recognizer_name());
    }
    Ok(if no_ocr { pipeline.without_ocr() } else { pipeline })
}

/// Print warnings and the no-rows notice to stderr.
fn report(extraction: &Extraction) {
    for warning in extraction.warnings() {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }

    if extraction.is_empty() {
        let reason = match extraction.source {
            TextSource::None => "no text could be acquired from the document",
            _ => "no line matched the row format",
        };
        eprintln!(
            "{} No table data detected: {}",
            style("⚠").yellow(),
            reason
        );
    } else {
        info!(
            "{} rows via {:?} in {}ms",
            extraction.table.len(),
            extraction.source,
            extraction.processing_time_ms
        );
    }
}

fn with_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}
