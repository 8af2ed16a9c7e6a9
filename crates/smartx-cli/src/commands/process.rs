//! Process command - extract fields from a single PDF and fill the schema.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, info};

use smartx_core::{PipelineOutput, QueryStrategy, VectorStore};

use super::{build_pipeline, cancellable, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// How topic hits are combined into one page
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Print the selected page text and the raw model response
    #[arg(long)]
    show_page: bool,

    /// Print which template fields were filled
    #[arg(long)]
    show_report: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON object with page, stage, result and schema
    Json,
    /// CSV of the schema fields
    Csv,
    /// Result summary followed by the schema
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

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StrategyArg {
    /// Top hit of the first topic
    FirstTopic,
    /// Majority vote across topics
    Consensus,
}

impl From<StrategyArg> for QueryStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::FirstTopic => QueryStrategy::FirstTopic,
            StrategyArg::Consensus => QueryStrategy::Consensus,
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "pdf" {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    let mut config = load_config(config_path)?;
    if let Some(strategy) = args.strategy {
        config.retrieval.strategy = strategy.into();
    }
    let pipeline = build_pipeline(&config, VectorStore::new())?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("Reading PDF...");

    let data = fs::read(&args.input)?;

    pb.set_message("Selecting page and extracting fields...");
    let result = cancellable(pipeline.process_pdf(&data)).await;
    pb.finish_and_clear();
    let output = result?;

    if args.show_page {
        eprintln!("{} Page {} (score {:.3})", style("ℹ").blue(), output.page + 1, output.score);
        eprintln!("{}", output.page_text);
        eprintln!();
        eprintln!("{} Model response", style("ℹ").blue());
        eprintln!("{}", output.raw_response);
        eprintln!();
    }

    let formatted = format_output(&output, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &formatted)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", formatted);
    }

    if args.show_report {
        let report = &output.report;
        eprintln!(
            "{} Filled {} of {} fields",
            style("ℹ").blue(),
            report.matched.len(),
            report.matched.len() + report.unfilled.len()
        );
        if !report.ignored_keys.is_empty() {
            eprintln!(
                "{} Not in template: {}",
                style("!").yellow(),
                report.ignored_keys.join(", ")
            );
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_output(output: &PipelineOutput, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(output)?),
        OutputFormat::Csv => format_csv(output),
        OutputFormat::Text => format_text(output),
    }
}

fn format_csv(output: &PipelineOutput) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["category", "name", "display_name", "type", "value"])?;

    for field in output.schema.fields() {
        wtr.write_record([
            field.category.as_str(),
            field.internal_name.as_str(),
            field.display_name.as_str(),
            field.control_type.as_str(),
            cell(field.value()).as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(output: &PipelineOutput) -> anyhow::Result<String> {
    let mut text = String::new();

    text.push_str(&format!("Page: {}\n", output.page + 1));
    text.push_str(&format!("Stage: {}\n", output.stage));
    text.push_str(&format!(
        "Result ({} fields): {}\n",
        output.result.len(),
        serde_json::to_string(&output.result)?
    ));
    text.push('\n');
    text.push_str("Schema:\n");
    text.push_str(&serde_json::to_string_pretty(&output.schema)?);
    text.push('\n');

    Ok(text)
}

/// Render a slot value as a CSV cell.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell(&json!(null)), "");
        assert_eq!(cell(&json!("Diesel")), "Diesel");
        assert_eq!(cell(&json!(120)), "120");
        assert_eq!(cell(&json!(35.5)), "35.5");
    }

    #[test]
    fn test_strategy_conversion() {
        assert_eq!(QueryStrategy::from(StrategyArg::Consensus), QueryStrategy::Consensus);
        assert_eq!(QueryStrategy::from(StrategyArg::FirstTopic), QueryStrategy::FirstTopic);
    }
}
