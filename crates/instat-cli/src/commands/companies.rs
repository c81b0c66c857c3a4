//! Companies command - list vendor profiles.

use clap::Args;
use console::style;
use serde::Serialize;

use instat_core::readers::PLACEHOLDER_PARTY_ID;

use super::{load_config, load_registry};

/// Arguments for the companies command.
#[derive(Args)]
pub struct CompaniesArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct CompanyInfo<'a> {
    company: &'a str,
    party_id: &'a str,
    party_name: &'a str,
    envelope_id: &'a str,
    flow_code: &'a str,
    produces_xml: bool,
}

pub fn run(args: CompaniesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = load_registry(&config)?;

    let companies: Vec<CompanyInfo> = registry
        .profiles()
        .iter()
        .map(|p| CompanyInfo {
            company: &p.company,
            party_id: &p.party.id,
            party_name: &p.party.name,
            envelope_id: &p.envelope_id,
            flow_code: p.flow_code.as_str(),
            produces_xml: p.produce_xml,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&companies)?);
        return Ok(());
    }

    for info in &companies {
        println!(
            "{:<12} {:<14} {} envelope {} flow {}",
            style(info.company).bold(),
            info.party_name,
            info.party_id,
            info.envelope_id,
            info.flow_code
        );
        if info.party_id == PLACEHOLDER_PARTY_ID {
            println!("   {} party id not configured, using the reference workbook authorization number", style("⚠").yellow());
        }
    }
    Ok(())
}
