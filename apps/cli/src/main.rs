// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! column-qa: extract structural column features from IFC models.
//!
//! Defaults come from the environment (see [`config::Config`]); flags
//! override them. Logs go to stderr, controlled by `RUST_LOG` or `-v`.
//!
//! ```bash
//! column-qa extract tower.ifc --type IfcColumn --format ndjson
//! RUST_LOG=column_qa_features=debug column-qa vector tower.ifc --width 24
//! ```

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use column_qa_features::{
    fit_to_width, ExtractOptions, ExtractionPipeline, FeatureRecord, IfcModel, LengthUnit,
};
use config::{parse_types, Config};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// column-qa - geometric feature extraction for structural columns
#[derive(Parser)]
#[command(name = "column-qa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One JSON document with all records
    Json,
    /// One record per line
    Ndjson,
}

/// Options shared by every command that runs an extraction
#[derive(clap::Args)]
struct ExtractArgs {
    /// Input IFC file
    input: PathBuf,

    /// Structural type to extract (repeatable or comma-separated)
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    types: Vec<String>,

    /// Measure elements in parallel
    #[arg(long)]
    parallel: bool,

    /// Fail when the model declares no length unit
    #[arg(long)]
    strict_units: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one feature record per element
    Extract {
        #[command(flatten)]
        args: ExtractArgs,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print classifier input vectors, one per element
    Vector {
        #[command(flatten)]
        args: ExtractArgs,

        /// Model input width (pads or truncates the 20 features)
        #[arg(long)]
        width: Option<usize>,
    },
}

/// Initialize the tracing subscriber; RUST_LOG wins over -v
fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "info",
            1 => "column_qa_core=debug,column_qa_geometry=debug,column_qa_features=debug,column_qa=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Flags layered over the environment defaults
fn effective_settings(args: &ExtractArgs, config: &Config) -> (Vec<String>, ExtractOptions, bool) {
    let types: Vec<String> = args.types.iter().flat_map(|t| parse_types(t)).collect();
    let types = if types.is_empty() {
        config.types.clone()
    } else {
        types
    };
    let options = ExtractOptions {
        strict_units: args.strict_units || config.strict_units,
    };
    (types, options, args.parallel || config.parallel)
}

/// Run an extraction over one model
fn extract_records(
    args: &ExtractArgs,
    config: &Config,
) -> Result<(IfcModel, LengthUnit, Vec<FeatureRecord>)> {
    let (types, options, parallel) = effective_settings(args, config);
    let types: Vec<&str> = types.iter().map(String::as_str).collect();

    let model = IfcModel::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let pipeline = ExtractionPipeline::for_model(&model, options);
    let unit = pipeline.resolve_unit(&model)?;

    let records = if parallel {
        pipeline.extract_parallel(&model, &types)?
    } else {
        pipeline.extract(&model, &types)?.collect()
    };

    let degraded = records.iter().filter(|r| r.is_degraded()).count();
    tracing::info!(
        records = records.len(),
        degraded,
        "Extraction finished"
    );
    Ok((model, unit, records))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

fn run_extract(args: &ExtractArgs, format: OutputFormat, output: Option<&Path>, config: &Config) -> Result<()> {
    let (model, unit, records) = extract_records(args, config)?;
    let mut out = open_output(output)?;

    match format {
        OutputFormat::Json => {
            let document = serde_json::json!({
                "source_file": model.source(),
                "schema": model.schema().as_str(),
                "unit": unit,
                "count": records.len(),
                "records": records,
            });
            serde_json::to_writer_pretty(&mut out, &document)?;
            writeln!(out)?;
        }
        OutputFormat::Ndjson => {
            for record in &records {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn run_vector(args: &ExtractArgs, width: Option<usize>, config: &Config) -> Result<()> {
    let width = width.unwrap_or(config.feature_width);
    let (_, _, records) = extract_records(args, config)?;
    let mut out = open_output(None)?;

    for record in &records {
        let vector = fit_to_width(&record.feature_vector(), width);
        let line = serde_json::json!({
            "element_id": record.element_id,
            "features": vector,
        });
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from_env();
    tracing::debug!(?config, "Loaded configuration");

    match &cli.command {
        Commands::Extract {
            args,
            format,
            output,
        } => run_extract(args, *format, output.as_deref(), &config),
        Commands::Vector { args, width } => run_vector(args, *width, &config),
    }
}
