//! Batch processing command for multiple invoice PDFs.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use instat_core::models::InstatConfig;
use instat_core::{ArticleReference, ArticleResolver, InvoiceReader, ProfileRegistry, RunOptions, RunReport};

use super::{load_config, load_reference, load_registry, print_report};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of invoice PDFs
    #[arg(required = true)]
    input: String,

    /// Vendor company; detected from each file's folder name when absent
    #[arg(long)]
    company: Option<String>,

    /// Reference workbook with article codes and weights
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write the declaration rows as CSV
    #[arg(long)]
    csv: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    report: Option<RunReport>,
    error: Option<String>,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    let registry = load_registry(&config)?;
    let reference = load_reference(args.reference.as_deref(), &config)?;
    let mut options = RunOptions::from_config(&config);
    if let Some(output_dir) = &args.output_dir {
        options.output_dir = output_dir.clone();
    }
    options.write_csv |= args.csv;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        match process_single_file(&path, &args, &registry, &reference, &config, &options) {
            Ok(report) => results.push(ProcessResult {
                path,
                report: Some(report),
                error: None,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        report: None,
                        error: Some(error_msg),
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    pb.abandon();
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let successful: Vec<&RunReport> = results.iter().filter_map(|r| r.report.as_ref()).collect();
    let failed: Vec<&ProcessResult> = results.iter().filter(|r| r.error.is_some()).collect();

    for report in &successful {
        print_report(report);
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    args: &BatchArgs,
    registry: &ProfileRegistry,
    reference: &ArticleReference,
    config: &InstatConfig,
    options: &RunOptions,
) -> anyhow::Result<RunReport> {
    let profile = match &args.company {
        Some(company) => registry
            .get(company)
            .ok_or_else(|| anyhow::anyhow!("Unknown company {:?}", company))?,
        None => path
            .parent()
            .and_then(|folder| registry.detect_company(folder))
            .ok_or_else(|| anyhow::anyhow!("No known company in the folder name of {}", path.display()))?,
    };

    let resolver = ArticleResolver::with_config(reference, &config.resolver);
    let reader = InvoiceReader::new(profile, resolver, &config.extraction)?;
    Ok(reader.run(path, options)?)
}
