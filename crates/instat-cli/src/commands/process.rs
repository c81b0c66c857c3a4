//! Process command - read a single invoice PDF.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use instat_core::{ArticleResolver, InvoiceReader, RunOptions};

use super::{load_config, load_reference, load_registry, print_report};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Invoice PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Vendor company (see `instat companies`)
    #[arg(long)]
    company: String,

    /// Reference workbook with article codes and weights
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// External XSD to validate against
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Also write the declaration rows as CSV
    #[arg(long)]
    csv: bool,
}

pub fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let registry = load_registry(&config)?;
    let profile = registry.get(&args.company).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown company {:?}. Known companies: {}",
            args.company,
            registry.companies().join(", ")
        )
    })?;
    let reference = load_reference(args.reference.as_deref(), &config)?;
    let resolver = ArticleResolver::with_config(&reference, &config.resolver);
    let reader = InvoiceReader::new(profile, resolver, &config.extraction)?;

    let mut options = RunOptions::from_config(&config);
    if let Some(output_dir) = args.output_dir {
        options.output_dir = output_dir;
    }
    if args.schema.is_some() {
        options.schema = args.schema;
    }
    options.write_csv |= args.csv;

    info!("Processing file: {}", args.input.display());
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Reading {}", args.input.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let report = reader.run(&args.input, &options);
    pb.finish_and_clear();

    print_report(&report?);
    Ok(())
}
