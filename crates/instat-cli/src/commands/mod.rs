//! Subcommands and the loading steps they share.

pub mod batch;
pub mod companies;
pub mod config;
pub mod process;

use std::fs::File;
use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

use instat_core::models::InstatConfig;
use instat_core::{ArticleReference, ProfileRegistry, RunReport};

/// Configuration from `path`, else from the default location, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<InstatConfig> {
    if let Some(path) = path {
        return Ok(InstatConfig::from_file(Path::new(path))?);
    }
    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(InstatConfig::from_file(&default_path)?)
    } else {
        Ok(InstatConfig::default())
    }
}

/// Built-in profiles, extended by the configured profiles file.
pub fn load_registry(config: &InstatConfig) -> anyhow::Result<ProfileRegistry> {
    match &config.profiles.path {
        Some(path) => Ok(ProfileRegistry::from_file(path)?),
        None => Ok(ProfileRegistry::builtin()),
    }
}

/// The reference table from `path` or the configured workbook. A `.csv`
/// file holds the article sheet only.
pub fn load_reference(path: Option<&Path>, config: &InstatConfig) -> anyhow::Result<ArticleReference> {
    let path: PathBuf = match path.or(config.reference.workbook.as_deref()) {
        Some(path) => path.to_path_buf(),
        None => anyhow::bail!("No reference workbook given. Pass --reference or set reference.workbook in the config."),
    };
    if !path.exists() {
        anyhow::bail!("Reference file not found: {}", path.display());
    }

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let reference = if is_csv {
        ArticleReference::from_csv(File::open(&path)?)?
    } else {
        ArticleReference::from_workbook(&path, &config.reference)?
    };
    debug!("Loaded {} articles from {}", reference.len(), path.display());
    Ok(reference)
}

pub fn print_report(report: &RunReport) {
    println!(
        "{} {}: {} declarations, {} items ({}ms)",
        style("✓").green(),
        report.document.display(),
        report.declarations,
        report.items,
        report.processing_time_ms
    );
    for path in [&report.xml, &report.xlsx, &report.csv].into_iter().flatten() {
        println!("   wrote {}", path.display());
    }

    if let Some(validation) = &report.validation {
        if validation.is_valid() {
            println!("   {} XML matches the schema", style("✓").green());
        } else {
            println!(
                "   {} {} schema violations:",
                style("✗").red(),
                validation.violations.len()
            );
            for violation in &validation.violations {
                println!("     - {}", violation);
            }
        }
    }

    if !report.pages_to_double_check.is_empty() {
        println!(
            "   {} Pages to double check: {:?}",
            style("⚠").yellow(),
            report.pages_to_double_check
        );
        for issue in &report.issues {
            println!("     - {}", issue);
        }
    }
}
