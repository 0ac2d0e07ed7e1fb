//! Process command - extract fields from a single OCR result file.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use rcpt_core::models::ExtractionResult;
use rcpt_core::receipt::{format_amount, Diagnostics, ExtractOptions, Extraction, ReceiptParser};

use super::{load_config, OcrJsonFile};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// OCR result file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include raw text, timings and warnings in JSON output
    #[arg(long)]
    debug: bool,

    /// Show per-field confidence scores
    #[arg(long)]
    show_confidence: bool,

    /// Run the field detectors on separate threads
    #[arg(long)]
    parallel: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// JSON document: the result fields, plus diagnostics in debug mode.
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    result: &'a ExtractionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a Diagnostics>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Extracting fields...");

    let parser = ReceiptParser::with_config(Arc::new(config.extraction));
    let parser = if args.parallel {
        parser.with_parallel_detectors(true)
    } else {
        parser
    };

    let options = ExtractOptions {
        debug_mode: args.debug || args.show_confidence,
    };
    let extraction = parser.extract_with(&OcrJsonFile, args.input.as_path(), options)?;

    pb.finish_and_clear();

    let output = format_extraction(&extraction, args.format, args.debug)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        print_confidence(&extraction);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_confidence(extraction: &Extraction) {
    let percent = |c: Option<f32>| match c {
        Some(c) => format!("{:.1}%", c * 100.0),
        None => "not found".to_string(),
    };

    eprintln!();
    eprintln!(
        "{} Extraction confidence: {:.1}%",
        style("ℹ").blue(),
        extraction.result.confidence_score * 100.0
    );
    if let Some(diagnostics) = &extraction.diagnostics {
        let fields = diagnostics.field_confidence;
        eprintln!("   merchant: {}", percent(fields.merchant));
        eprintln!("   date:     {}", percent(fields.date));
        eprintln!("   total:    {}", percent(fields.total));
        for warning in &diagnostics.warnings {
            eprintln!("{} {}", style("⚠").yellow(), warning);
        }
    }
}

/// Render one extraction in the requested format.
pub fn format_extraction(
    extraction: &Extraction,
    format: OutputFormat,
    with_diagnostics: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let report = Report {
                result: &extraction.result,
                diagnostics: extraction
                    .diagnostics
                    .as_ref()
                    .filter(|_| with_diagnostics),
            };
            Ok(serde_json::to_string(&report)?)
        }
        OutputFormat::Csv => format_csv(&extraction.result),
        OutputFormat::Text => Ok(format_text(&extraction.result)),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "merchant_name",
        "transaction_date",
        "total_amount_raw",
        "total_amount_value",
        "confidence_score",
    ])?;

    wtr.write_record([
        result.merchant_name.clone().unwrap_or_default(),
        result.transaction_date_string().unwrap_or_default(),
        result.total_amount_raw().unwrap_or_default().to_string(),
        result
            .total_amount_value()
            .map(|v| v.to_string())
            .unwrap_or_default(),
        format!("{:.3}", result.confidence_score),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    let missing = || "-".to_string();

    output.push_str(&format!(
        "Merchant: {}\n",
        result.merchant_name.clone().unwrap_or_else(missing)
    ));
    output.push_str(&format!(
        "Date:     {}\n",
        result.transaction_date_string().unwrap_or_else(missing)
    ));
    match &result.total_amount {
        Some(total) => output.push_str(&format!(
            "Total:    {} ({})\n",
            total.raw,
            format_amount(total.value, ',', '.')
        )),
        None => output.push_str("Total:    -\n"),
    }
    output.push_str(&format!(
        "Confidence: {:.1}%\n",
        result.confidence_score * 100.0
    ));

    output
}
