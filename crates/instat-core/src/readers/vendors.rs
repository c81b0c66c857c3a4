//! Built-in vendor profiles and profile lookup.

use std::path::Path;

use tracing::{debug, info};

use super::profile::{
    CodeOverride, ColumnRoles, CountryRule, DeclarationIdStrategy, ExceptionTables, LineItemLayout,
    MetadataLayout, NatureCodes, PartyInfo, PartyTag, VatLocator, VendorProfile,
};
use crate::error::InstatError;
use crate::models::FlowCode;
use crate::pdf::RelativeBox;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn overrides(pairs: &[(&str, &str)]) -> Vec<CodeOverride> {
    pairs.iter().map(|(from, to)| CodeOverride::new(*from, *to)).collect()
}

/// Columns of the ruled item table shared by the Jessy & co and ZHC layouts.
fn discount_table(clean_descriptions: bool) -> LineItemLayout {
    LineItemLayout::ColumnTable {
        columns: strings(&["Désignation", "Quantité", "P.U. HT", "% REM", "Remise HT", "Montant HT"]),
        anchor: "P.U. HT".to_string(),
        roles: ColumnRoles {
            article_code: None,
            description: "Désignation".to_string(),
            quantity: "Quantité".to_string(),
            unit_price: "P.U. HT".to_string(),
            discount_percent: Some("% REM".to_string()),
            discount_amount: Some("Remise HT".to_string()),
            net_amount: "Montant HT".to_string(),
        },
        clean_descriptions,
        reconcile_discount: true,
        round_net_amount: true,
    }
}

/// Header strip in the top right corner, `number date client`.
const HEADER_STRIP: RelativeBox = RelativeBox::new(3.0 / 8.0, 0.0, 1.0, 1.8 / 22.5);

fn ivivi() -> VendorProfile {
    VendorProfile {
        company: "IVIVI".to_string(),
        party: PartyInfo {
            id: "FR0853863996400013".to_string(),
            name: "IVIVI".to_string(),
        },
        party_tag: PartyTag::default(),
        envelope_id: "S4U3".to_string(),
        declaration_type_code: 1,
        flow_code: FlowCode::Dispatch,
        declaration_id: DeclarationIdStrategy::InvoiceSuffix,
        origin: CountryRule::VatPrefix { country_fallback: false },
        destination: CountryRule::Fixed { code: "FR".to_string() },
        require_destination: false,
        statistical_procedure_code: 11,
        nature_of_transaction: NatureCodes { a: 1, b: None },
        mode_of_transport: 3,
        region_code: "93".to_string(),
        apply_discount: false,
        produce_xml: true,
        metadata: MetadataLayout::HeaderTable {
            labels: strings(&[
                "Numéro",
                "Date",
                "Code client",
                "Date échéance",
                "Mode de règlement",
                "N° de Tva intracom",
            ]),
            number_label: "Numéro".to_string(),
            date_label: "Date".to_string(),
            vat_label: "N° de Tva intracom".to_string(),
            client_label: Some("Code client".to_string()),
            continuation_marker: "Facture N°".to_string(),
        },
        line_items: LineItemLayout::ColumnTable {
            columns: strings(&["Code", "Description", "Qté", "P.U. HT", "Montant HT", "TVA"]),
            anchor: "Code".to_string(),
            roles: ColumnRoles {
                article_code: Some("Code".to_string()),
                description: "Description".to_string(),
                quantity: "Qté".to_string(),
                unit_price: "P.U. HT".to_string(),
                discount_percent: None,
                discount_amount: None,
                net_amount: "Montant HT".to_string(),
            },
            clean_descriptions: false,
            reconcile_discount: false,
            round_net_amount: false,
        },
        exceptions: ExceptionTables::default(),
    }
}

fn jessy() -> VendorProfile {
    VendorProfile {
        company: "Jessy & co".to_string(),
        party: PartyInfo {
            id: "FR0979124578000030".to_string(),
            name: "Jessy & co".to_string(),
        },
        party_tag: PartyTag::default(),
        envelope_id: "L5B7".to_string(),
        declaration_type_code: 1,
        flow_code: FlowCode::Dispatch,
        declaration_id: DeclarationIdStrategy::PeriodYearMonth,
        origin: CountryRule::Fixed { code: "IT".to_string() },
        destination: CountryRule::VatPrefix { country_fallback: true },
        require_destination: true,
        statistical_procedure_code: 21,
        nature_of_transaction: NatureCodes { a: 1, b: Some(1) },
        mode_of_transport: 3,
        region_code: "93".to_string(),
        apply_discount: true,
        produce_xml: true,
        metadata: MetadataLayout::HeaderStrip {
            region: HEADER_STRIP,
            address: RelativeBox::new(0.42, 0.08, 1.0, 0.20),
            vat: VatLocator::Pattern {
                pattern: r"^\w{2}\w?\d+\w*\d+$".to_string(),
            },
            country_from_vat: false,
        },
        line_items: discount_table(true),
        exceptions: ExceptionTables {
            noise_markers: strings(&["ORIGIN", "SHIPPER", "GOODS"]),
            designation_rewrites: overrides(&[("FRAIS TRANSPORT", "FRAISTRANSPORT")]),
            repair_stripped_words: strings(&["HS", "ELASTAIN", "POLIESTER", "ACRYLIQUE", "elasatin"]),
            repair_rewrites: overrides(&[(r"(?i)(TUNIQUE)(\d+)", "TUNIQUE ${2}")]),
            dropped_designations: strings(&["FRAISTRANSPORT"]),
            country_overrides: overrides(&[
                ("MAYOTTE", "FR"),
                ("SUISSE", "CH"),
                ("ROYAUME-UNI", "GB"),
                ("BELGIQUE", "BE"),
            ]),
            vat_prefix_overrides: overrides(&[("ESB", "ES")]),
            excluded_destinations: strings(&["FR", "Royaume-Uni"]),
            min_vat_len: Some(4),
        },
    }
}

fn dolvika_like(company: &str, party_id: &str, envelope_id: &str) -> VendorProfile {
    VendorProfile {
        company: company.to_string(),
        party: PartyInfo {
            id: party_id.to_string(),
            name: company.to_string(),
        },
        party_tag: PartyTag::default(),
        envelope_id: envelope_id.to_string(),
        declaration_type_code: 1,
        flow_code: FlowCode::Dispatch,
        declaration_id: DeclarationIdStrategy::InvoiceSuffix,
        origin: CountryRule::Fixed { code: "FR".to_string() },
        destination: CountryRule::CountryName { prefix_fallback: false },
        require_destination: false,
        statistical_procedure_code: 21,
        nature_of_transaction: NatureCodes { a: 1, b: Some(1) },
        mode_of_transport: 3,
        region_code: "93".to_string(),
        apply_discount: false,
        produce_xml: true,
        metadata: MetadataLayout::TitleLine {
            regions: vec![
                RelativeBox::new(0.0, 0.30, 1.0, 0.34),
                RelativeBox::new(0.0, 0.25, 1.0, 0.30),
            ],
            pattern: r"(.+?)\s(\d{2}/\d{2}/\d{4})".to_string(),
            address: RelativeBox::new(0.5, 0.10, 1.0, 0.28),
            vat_label: "N° TVA".to_string(),
        },
        line_items: LineItemLayout::TextRows {
            region: RelativeBox::new(0.0, 0.38, 1.0, 1.0),
            pattern: r"(^\d{4})\s+([\w\s']+)(\s+\d+,\d{2})+".to_string(),
            columns: strings(&[
                "Code article",
                "Désignation",
                "Quantité",
                "P.U. HT",
                "Rem. %",
                "Montant HT",
                "TVA",
            ]),
            optional_column: 4,
            roles: ColumnRoles {
                article_code: Some("Code article".to_string()),
                description: "Désignation".to_string(),
                quantity: "Quantité".to_string(),
                unit_price: "P.U. HT".to_string(),
                discount_percent: Some("Rem. %".to_string()),
                discount_amount: None,
                net_amount: "Montant HT".to_string(),
            },
        },
        exceptions: ExceptionTables::default(),
    }
}

fn zhc_like(company: &str, party_name: &str, party_id: &str, envelope_id: &str) -> VendorProfile {
    VendorProfile {
        company: company.to_string(),
        party: PartyInfo {
            id: party_id.to_string(),
            name: party_name.to_string(),
        },
        party_tag: PartyTag::default(),
        envelope_id: envelope_id.to_string(),
        declaration_type_code: 1,
        flow_code: FlowCode::Dispatch,
        declaration_id: DeclarationIdStrategy::PeriodYearMonth,
        origin: CountryRule::Fixed { code: "CN".to_string() },
        destination: CountryRule::VatPrefix { country_fallback: false },
        require_destination: true,
        statistical_procedure_code: 21,
        nature_of_transaction: NatureCodes { a: 1, b: Some(1) },
        mode_of_transport: 3,
        region_code: "93".to_string(),
        apply_discount: true,
        produce_xml: true,
        metadata: MetadataLayout::HeaderStrip {
            region: HEADER_STRIP,
            address: RelativeBox::new(0.42, 0.08, 1.0, 0.30),
            vat: VatLocator::Label {
                label: "TVA intracom client".to_string(),
            },
            country_from_vat: true,
        },
        line_items: discount_table(false),
        exceptions: ExceptionTables {
            dropped_designations: strings(&["FRAIS DE TRANSPORT"]),
            vat_prefix_overrides: overrides(&[("ES", "ES"), ("ATU", "AT"), ("EL", "GR")]),
            excluded_destinations: strings(&["FR", "GB", "CH", "CHE", "PH"]),
            min_vat_len: Some(4),
            ..ExceptionTables::default()
        },
    }
}

/// Party id used by profiles whose declarant id is not known yet. A
/// profiles file must supply the real id before their XML is submitted.
pub const PLACEHOLDER_PARTY_ID: &str = "FR0000000000000000";

/// The six built-in vendor profiles.
pub fn builtin_profiles() -> Vec<VendorProfile> {
    vec![
        ivivi(),
        jessy(),
        dolvika_like("DOLVIKA", "FR3451291046400019", "S4FW"),
        dolvika_like("MODE CMD", PLACEHOLDER_PARTY_ID, "MCMD"),
        zhc_like("SARL ZHC", "ZHC", "FR4980002435800015", "L5BA"),
        zhc_like("Z.H.C", "Z.H.C", PLACEHOLDER_PARTY_ID, "ZHC"),
    ]
}

/// The set of vendor profiles available to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRegistry {
    profiles: Vec<VendorProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileRegistry {
    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles(),
        }
    }

    /// Built-in profiles, replaced or extended by a JSON array of profiles.
    pub fn from_file(path: &Path) -> Result<Self, InstatError> {
        let content = std::fs::read_to_string(path)?;
        let extra: Vec<VendorProfile> = serde_json::from_str(&content)
            .map_err(|e| InstatError::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded {} vendor profiles from {}", extra.len(), path.display());
        Ok(Self::builtin().with_profiles(extra))
    }

    /// Add profiles; a profile with an existing company key replaces it.
    pub fn with_profiles(mut self, profiles: Vec<VendorProfile>) -> Self {
        for profile in profiles {
            match self.position(&profile.company) {
                Some(i) => {
                    debug!("Overriding profile {}", profile.company);
                    self.profiles[i] = profile;
                }
                None => self.profiles.push(profile),
            }
        }
        self
    }

    fn position(&self, company: &str) -> Option<usize> {
        let company = company.trim();
        self.profiles
            .iter()
            .position(|p| p.company.to_lowercase() == company.to_lowercase())
    }

    /// Case-insensitive lookup by company key.
    pub fn get(&self, company: &str) -> Option<&VendorProfile> {
        self.position(company).map(|i| &self.profiles[i])
    }

    pub fn profiles(&self) -> &[VendorProfile] {
        &self.profiles
    }

    pub fn companies(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.company.as_str()).collect()
    }

    /// The profile whose company key appears in the name of `folder`; longer
    /// keys win.
    pub fn detect_company(&self, folder: &Path) -> Option<&VendorProfile> {
        let name = folder.file_name()?.to_string_lossy().to_uppercase();
        let mut candidates: Vec<&VendorProfile> = self
            .profiles
            .iter()
            .filter(|p| name.contains(&p.company.to_uppercase()))
            .collect();
        candidates.sort_by_key(|p| std::cmp::Reverse(p.company.len()));
        candidates.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Party;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_parties_are_valid() {
        for profile in builtin_profiles() {
            assert!(
                Party::new(&profile.party.id, &profile.party.name).is_ok(),
                "{}",
                profile.company
            );
            assert!((1..=4).contains(&profile.envelope_id.len()), "{}", profile.company);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.get("jessy & CO").unwrap().envelope_id, "L5B7");
        assert_eq!(registry.get(" dolvika ").unwrap().party.id, "FR3451291046400019");
        assert!(registry.get("ACME").is_none());
        assert_eq!(registry.companies().len(), 6);
    }

    #[test]
    fn test_detect_company_from_folder() {
        let registry = ProfileRegistry::builtin();
        let found = registry.detect_company(Path::new("/data/Factures SARL ZHC 2024")).unwrap();
        assert_eq!(found.company, "SARL ZHC");
        let found = registry.detect_company(Path::new("/data/jessy & co - mars")).unwrap();
        assert_eq!(found.company, "Jessy & co");
        assert!(registry.detect_company(Path::new("/data/misc")).is_none());
    }

    #[test]
    fn test_profiles_file_overrides_builtin() {
        let mut ivivi = ivivi();
        ivivi.envelope_id = "ZZ01".to_string();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, serde_json::to_string(&vec![ivivi]).unwrap()).unwrap();

        let registry = ProfileRegistry::from_file(&path).unwrap();
        assert_eq!(registry.profiles().len(), 6);
        assert_eq!(registry.get("IVIVI").unwrap().envelope_id, "ZZ01");
    }
}
