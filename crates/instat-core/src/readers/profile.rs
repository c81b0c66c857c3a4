//! Vendor profiles.
//!
//! A profile holds everything that differs between two vendors: who
//! declares, where the header and the item table sit on the page, how the
//! destination is derived and which data-cleaning exceptions apply. The
//! reader itself is the same for every vendor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::FlowCode;
use crate::pdf::RelativeBox;

/// Declarant identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyInfo {
    /// 18-character party id.
    pub id: String,
    /// Party name, also searched on the first page of every document.
    pub name: String,
}

/// Attributes written on the `<Party>` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyTag {
    pub party_type: String,
    pub party_role: String,
}

impl Default for PartyTag {
    fn default() -> Self {
        Self {
            party_type: "TDP".to_string(),
            party_role: "sender".to_string(),
        }
    }
}

impl PartyTag {
    /// Opening tag that replaces the bare `<Party>`.
    pub fn opening_tag(&self) -> String {
        format!(
            r#"<Party partyType="{}" partyRole="{}">"#,
            self.party_type, self.party_role
        )
    }
}

/// How the six-digit declaration id is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationIdStrategy {
    /// Last six characters of the invoice number.
    InvoiceSuffix,
    /// `YYYYMM` of the invoice date.
    PeriodYearMonth,
}

impl DeclarationIdStrategy {
    pub fn declaration_id(&self, invoice_number: &str, invoice_date: NaiveDate) -> String {
        match self {
            Self::InvoiceSuffix => {
                let chars: Vec<char> = invoice_number.chars().collect();
                chars[chars.len().saturating_sub(6)..].iter().collect()
            }
            Self::PeriodYearMonth => invoice_date.format("%Y%m").to_string(),
        }
    }
}

/// Derivation of an origin or destination country code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CountryRule {
    /// Always the same code.
    Fixed { code: String },
    /// From the country printed in the address block. Unknown names give
    /// their first two characters when `prefix_fallback` is set.
    CountryName {
        #[serde(default)]
        prefix_fallback: bool,
    },
    /// From the VAT number prefix, falling back to the country name when
    /// the page has no VAT number and `country_fallback` is set.
    VatPrefix {
        #[serde(default)]
        country_fallback: bool,
    },
}

/// Nature of transaction codes put on every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatureCodes {
    pub a: u8,
    #[serde(default)]
    pub b: Option<u8>,
}

/// Where a VAT number is found in the address block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum VatLocator {
    /// A whole line matching the pattern.
    Pattern { pattern: String },
    /// A line containing the label; the value follows the last colon.
    Label { label: String },
}

/// Where the invoice header is found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MetadataLayout {
    /// A two-row ruled table whose first row equals `labels`. Pages
    /// starting with `continuation_marker` carry no header and reuse the
    /// metadata of the invoice in progress.
    HeaderTable {
        labels: Vec<String>,
        number_label: String,
        date_label: String,
        vat_label: String,
        #[serde(default)]
        client_label: Option<String>,
        continuation_marker: String,
    },
    /// The last line of the first region whose last line matches
    /// `pattern` (number, then date). The address block holds a country
    /// line and a line starting with `vat_label`.
    TitleLine {
        regions: Vec<RelativeBox>,
        pattern: String,
        address: RelativeBox,
        vat_label: String,
    },
    /// The last line of `region` reads `number date client`.
    HeaderStrip {
        region: RelativeBox,
        address: RelativeBox,
        vat: VatLocator,
        /// Derive the country from the VAT number instead of reading a
        /// country line.
        #[serde(default)]
        country_from_vat: bool,
    },
}

/// Which columns carry which item values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    #[serde(default)]
    pub article_code: Option<String>,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    #[serde(default)]
    pub discount_percent: Option<String>,
    #[serde(default)]
    pub discount_amount: Option<String>,
    pub net_amount: String,
}

/// Where the item table is found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LineItemLayout {
    /// A two-row ruled table whose header equals `columns`; each body cell
    /// holds one line per item.
    ColumnTable {
        columns: Vec<String>,
        /// Column whose line count is the item count.
        anchor: String,
        roles: ColumnRoles,
        /// Filter noise lines out of descriptions and re-segment them when
        /// their count disagrees with the anchor.
        #[serde(default)]
        clean_descriptions: bool,
        /// Check `quantity x unit price x rate` against the discount column.
        #[serde(default)]
        reconcile_discount: bool,
        /// Round the net amount to whole euros after reading it.
        #[serde(default)]
        round_net_amount: bool,
    },
    /// One text line per item within `region`, matched by `pattern` whose
    /// second group is the designation.
    TextRows {
        region: RelativeBox,
        pattern: String,
        columns: Vec<String>,
        /// Position of the column that may be missing from a row.
        optional_column: usize,
        roles: ColumnRoles,
    },
}

/// A literal replacement or prefix mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOverride {
    pub from: String,
    pub to: String,
}

impl CodeOverride {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Vendor-specific data-cleaning tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionTables {
    /// Description lines containing any of these are not items.
    pub noise_markers: Vec<String>,
    /// Literal rewrites applied to description lines.
    pub designation_rewrites: Vec<CodeOverride>,
    /// Words removed when descriptions are re-segmented.
    pub repair_stripped_words: Vec<String>,
    /// Regex rewrites applied when descriptions are re-segmented.
    pub repair_rewrites: Vec<CodeOverride>,
    /// Items with exactly this description are dropped.
    pub dropped_designations: Vec<String>,
    /// Country names mapped before the country table is consulted.
    pub country_overrides: Vec<CodeOverride>,
    /// VAT prefixes mapped before the letters of the VAT are used.
    pub vat_prefix_overrides: Vec<CodeOverride>,
    /// Pages whose country starts with any of these are rejected.
    pub excluded_destinations: Vec<String>,
    /// Pages with a VAT number shorter than this (or none) are rejected.
    pub min_vat_len: Option<usize>,
}

/// Everything the reader needs to know about one vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorProfile {
    /// Lookup key, e.g. `Jessy & co`.
    pub company: String,
    pub party: PartyInfo,
    #[serde(default)]
    pub party_tag: PartyTag,
    pub envelope_id: String,
    pub declaration_type_code: u8,
    pub flow_code: FlowCode,
    pub declaration_id: DeclarationIdStrategy,
    pub origin: CountryRule,
    pub destination: CountryRule,
    /// Drop items whose destination cannot be derived.
    #[serde(default)]
    pub require_destination: bool,
    pub statistical_procedure_code: u32,
    pub nature_of_transaction: NatureCodes,
    pub mode_of_transport: u8,
    pub region_code: String,
    /// Reduce the net amount by the discount rate.
    pub apply_discount: bool,
    /// Write an XML document for this vendor.
    #[serde(default = "default_true")]
    pub produce_xml: bool,
    pub metadata: MetadataLayout,
    pub line_items: LineItemLayout,
    #[serde(default)]
    pub exceptions: ExceptionTables,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declaration_id_strategies() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(DeclarationIdStrategy::InvoiceSuffix.declaration_id("FA000123", date), "000123");
        assert_eq!(DeclarationIdStrategy::InvoiceSuffix.declaration_id("123", date), "123");
        assert_eq!(DeclarationIdStrategy::PeriodYearMonth.declaration_id("FA000123", date), "202403");
    }

    #[test]
    fn test_party_tag() {
        assert_eq!(
            PartyTag::default().opening_tag(),
            r#"<Party partyType="TDP" partyRole="sender">"#
        );
    }

    #[test]
    fn test_country_rule_json() {
        let rule: CountryRule = serde_json::from_str(r#"{"kind": "VatPrefix", "country_fallback": true}"#).unwrap();
        assert_eq!(rule, CountryRule::VatPrefix { country_fallback: true });
        let rule: CountryRule = serde_json::from_str(r#"{"kind": "Fixed", "code": "IT"}"#).unwrap();
        assert_eq!(rule, CountryRule::Fixed { code: "IT".to_string() });
    }
}
