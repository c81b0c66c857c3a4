//! Configuration structures for the declaration pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the instat pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstatConfig {
    /// Article resolver configuration.
    pub resolver: ResolverConfig,

    /// Page extraction configuration.
    pub extraction: ExtractionConfig,

    /// Output configuration.
    pub output: OutputConfig,

    /// Reference workbook layout.
    pub reference: ReferenceConfig,

    /// XML schema configuration.
    pub schema: SchemaConfig,

    /// Vendor profile overrides.
    pub profiles: ProfilesConfig,
}

/// Article name matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum similarity ratio (0.0 - 1.0) for a fuzzy match.
    pub cutoff: f64,

    /// Strip a leading "LOT"/"LOTS" token before lookup.
    pub strip_lot_prefix: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cutoff: 0.6,
            strip_lot_prefix: true,
        }
    }
}

/// Page extraction tolerances, in PDF points unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Glyphs whose tops differ by at most this much share a line.
    pub line_y_tolerance: f64,

    /// Horizontal gap that separates two words.
    pub word_gap: f64,

    /// Parallel table rules closer than this are aligned.
    pub snap_tolerance: f64,

    /// Collinear table rules separated by at most this much are merged.
    pub join_tolerance: f64,

    /// Slack when intersecting table rules.
    pub intersection_tolerance: f64,

    /// Table rules shorter than this are ignored.
    pub edge_min_length: f64,

    /// Largest accepted difference (EUR) between a declared discount and
    /// the recomputed one.
    pub reconciliation_epsilon: f64,

    /// Table rows are kept only when more than this share of their cells
    /// is filled.
    pub min_filled_ratio: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            line_y_tolerance: 3.0,
            word_gap: 3.0,
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
            edge_min_length: 3.0,
            reconciliation_epsilon: 0.005,
            min_filled_ratio: 0.5,
        }
    }
}

/// Output files configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving XML and spreadsheet output.
    pub directory: PathBuf,

    /// Write the INSTAT XML document.
    pub write_xml: bool,

    /// Write the XLSX export.
    pub write_xlsx: bool,

    /// Write the CSV export.
    pub write_csv: bool,

    /// Validate the XML document against the schema.
    pub validate_xml: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            write_xml: true,
            write_xlsx: true,
            write_csv: false,
            validate_xml: true,
        }
    }
}

/// Reference workbook location and layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Path of the reference workbook.
    pub workbook: Option<PathBuf>,

    /// Sheet mapping articles to codes and weights.
    pub articles_sheet: String,
    pub article_column: String,
    pub code_column: String,
    pub weight_column: String,

    /// Sheet mapping companies to authorization numbers.
    pub companies_sheet: String,
    pub company_column: String,
    pub authorization_column: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            workbook: None,
            articles_sheet: "ARTICLE+CODE+POIDS".to_string(),
            article_column: "ARTICLE".to_string(),
            code_column: "CODE".to_string(),
            weight_column: "POIDS/ARTICLE".to_string(),
            companies_sheet: "STE+NO HABILITE".to_string(),
            company_column: "NOM STE".to_string(),
            authorization_column: "NO HBILITE".to_string(),
        }
    }
}

/// XML schema configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// External XSD; the bundled INSTAT schema is used when absent.
    pub path: Option<PathBuf>,
}

/// Vendor profile configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    /// JSON file with additional or overriding vendor profiles.
    pub path: Option<PathBuf>,
}

impl InstatConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: InstatConfig = serde_json::from_str(r#"{"resolver": {"cutoff": 0.8}}"#).unwrap();
        assert_eq!(config.resolver.cutoff, 0.8);
        assert!(config.resolver.strip_lot_prefix);
        assert_eq!(config.extraction, ExtractionConfig::default());
        assert_eq!(config.reference.weight_column, "POIDS/ARTICLE");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = InstatConfig::default();
        config.output.write_csv = true;
        config.save(&path).unwrap();
        assert_eq!(InstatConfig::from_file(&path).unwrap(), config);
    }
}
