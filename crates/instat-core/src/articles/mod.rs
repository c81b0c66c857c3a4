//! Article reference table and name resolution.
//!
//! The reference maps article names, as vendors print them, to a CN8 customs
//! code and a unit weight in kilograms. It is loaded once and only read
//! afterwards, so a single instance can be shared across documents.

mod resolver;
pub mod similarity;

pub use resolver::{ArticleField, ArticleMatch, ArticleResolver, ArticleValue, MatchKind};

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ReferenceError;
use crate::models::ReferenceConfig;
use crate::readers::numbers::parse_decimal;

/// Result type for reference loading.
pub type Result<T> = std::result::Result<T, ReferenceError>;

/// Length of a combined nomenclature code.
const CN8_LEN: usize = 8;

/// One row of the article sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleEntry {
    pub article: String,
    pub code: Option<String>,
    pub weight: Option<Decimal>,
}

impl ArticleEntry {
    /// Create an entry, normalizing the customs code.
    pub fn new(article: impl Into<String>, code: Option<&str>, weight: Option<Decimal>) -> Result<Self> {
        let article = article.into();
        let code = match code {
            Some(code) => normalize_code(&article, code)?,
            None => None,
        };
        Ok(Self { article, code, weight })
    }
}

/// Bring a customs code to its 8-character form.
///
/// Spreadsheets store codes as numbers and drop leading zeros; purely
/// numeric codes are padded back.
fn normalize_code(article: &str, raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let code = if trimmed.chars().all(|c| c.is_ascii_digit()) && trimmed.len() < CN8_LEN {
        format!("{:0>width$}", trimmed, width = CN8_LEN)
    } else {
        trimmed.to_string()
    };
    if code.chars().count() != CN8_LEN {
        return Err(ReferenceError::MalformedCode {
            article: article.to_string(),
            code: raw.to_string(),
        });
    }
    Ok(Some(code))
}

/// Read-only reference data for a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleReference {
    entries: Vec<ArticleEntry>,
    authorizations: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "ARTICLE")]
    article: String,
    #[serde(rename = "CODE", default)]
    code: Option<String>,
    #[serde(rename = "POIDS/ARTICLE", default)]
    weight: Option<String>,
}

impl ArticleReference {
    /// Build a reference from entries already in memory.
    pub fn new(entries: Vec<ArticleEntry>) -> Self {
        Self {
            entries,
            authorizations: BTreeMap::new(),
        }
    }

    /// Add company authorization numbers.
    pub fn with_authorizations(mut self, authorizations: BTreeMap<String, String>) -> Self {
        self.authorizations = authorizations;
        self
    }

    /// Load both reference sheets from a workbook.
    pub fn from_workbook(path: &Path, config: &ReferenceConfig) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| ReferenceError::Workbook(format!("{}: {}", path.display(), e)))?;

        let articles = read_sheet(&mut workbook, &config.articles_sheet)?;
        let entries = read_articles(&articles, config)?;

        let companies = read_sheet(&mut workbook, &config.companies_sheet)?;
        let authorizations = read_authorizations(&companies, config)?;

        info!(
            "Loaded {} articles and {} companies from {}",
            entries.len(),
            authorizations.len(),
            path.display()
        );
        Ok(Self {
            entries,
            authorizations,
        })
    }

    /// Load the article table from CSV with `ARTICLE`, `CODE` and
    /// `POIDS/ARTICLE` columns.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut entries = Vec::new();
        for row in csv_reader.deserialize::<CsvRow>() {
            let row = row.map_err(|e| ReferenceError::Csv(e.to_string()))?;
            let weight = match row.weight.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
                Some(w) => Some(parse_decimal(w).ok_or_else(|| {
                    ReferenceError::Csv(format!("invalid weight {:?} for {:?}", w, row.article))
                })?),
                None => None,
            };
            entries.push(ArticleEntry::new(row.article.trim(), row.code.as_deref(), weight)?);
        }
        debug!("Loaded {} articles from CSV", entries.len());
        Ok(Self::new(entries))
    }

    /// All article rows in sheet order.
    pub fn entries(&self) -> &[ArticleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose name equals `article`.
    pub fn get(&self, article: &str) -> Option<&ArticleEntry> {
        self.entries.iter().find(|e| e.article == article)
    }

    /// Customs authorization number of a company.
    pub fn authorization_number(&self, company: &str) -> Option<&str> {
        self.authorizations.get(company).map(String::as_str)
    }
}

fn read_sheet<RS: std::io::Read + std::io::Seek>(workbook: &mut Sheets<RS>, name: &str) -> Result<Range<Data>> {
    if !workbook.sheet_names().iter().any(|s| s == name) {
        return Err(ReferenceError::MissingSheet(name.to_string()));
    }
    workbook
        .worksheet_range(name)
        .map_err(|e| ReferenceError::Workbook(format!("failed to read sheet '{}': {}", name, e)))
}

fn header_index(range: &Range<Data>, sheet: &str, column: &str) -> Result<usize> {
    range
        .rows()
        .next()
        .and_then(|header| header.iter().position(|cell| cell_text(cell).as_deref() == Some(column)))
        .ok_or_else(|| ReferenceError::MissingColumn {
            sheet: sheet.to_string(),
            column: column.to_string(),
        })
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Data::Float(n) => Some(n.to_string()),
        Data::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

fn cell_decimal(cell: &Data) -> Option<Decimal> {
    match cell {
        Data::Float(n) => Decimal::try_from(*n).ok(),
        Data::Int(n) => Some(Decimal::from(*n)),
        Data::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn read_articles(range: &Range<Data>, config: &ReferenceConfig) -> Result<Vec<ArticleEntry>> {
    let sheet = &config.articles_sheet;
    let article_col = header_index(range, sheet, &config.article_column)?;
    let code_col = header_index(range, sheet, &config.code_column)?;
    let weight_col = header_index(range, sheet, &config.weight_column)?;

    let mut entries = Vec::new();
    for row in range.rows().skip(1) {
        let Some(article) = row.get(article_col).and_then(cell_text) else {
            continue;
        };
        let code = row.get(code_col).and_then(cell_text);
        let weight = row.get(weight_col).and_then(cell_decimal);
        entries.push(ArticleEntry::new(article, code.as_deref(), weight)?);
    }
    Ok(entries)
}

fn read_authorizations(range: &Range<Data>, config: &ReferenceConfig) -> Result<BTreeMap<String, String>> {
    let sheet = &config.companies_sheet;
    let company_col = header_index(range, sheet, &config.company_column)?;
    let number_col = header_index(range, sheet, &config.authorization_column)?;

    Ok(range
        .rows()
        .skip(1)
        .filter_map(|row| {
            let company = row.get(company_col).and_then(cell_text)?;
            let number = row.get(number_col).and_then(cell_text)?;
            Some((company, number))
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    pub(crate) fn sample_reference() -> ArticleReference {
        let csv = "ARTICLE,CODE,POIDS/ARTICLE\n\
                   TSHIRT,61091000,\"0,3\"\n\
                   ROBE,62044200,0.5\n\
                   PANTALON,62046200,0.6\n\
                   TUNIQUE,6114200,0.25\n\
                   CEINTURE,,0.1\n";
        ArticleReference::from_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_csv_reference_normalizes_codes() {
        let reference = sample_reference();
        assert_eq!(reference.len(), 5);
        assert_eq!(reference.get("TUNIQUE").unwrap().code.as_deref(), Some("06114200"));
        assert_eq!(reference.get("TSHIRT").unwrap().weight, Some(dec("0.3")));
        assert_eq!(reference.get("CEINTURE").unwrap().code, None);
    }

    #[test]
    fn test_malformed_code_is_rejected() {
        let csv = "ARTICLE,CODE,POIDS/ARTICLE\nROBE,620442001,0.5\n";
        let err = ArticleReference::from_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ReferenceError::MalformedCode { .. }));
    }

    #[test]
    fn test_authorization_lookup() {
        let reference = sample_reference()
            .with_authorizations(BTreeMap::from([("IVIVI".to_string(), "123456".to_string())]));
        assert_eq!(reference.authorization_number("IVIVI"), Some("123456"));
        assert_eq!(reference.authorization_number("DOLVIKA"), None);
    }

    #[test]
    fn test_missing_workbook() {
        let err = ArticleReference::from_workbook(Path::new("/nonexistent/ref.xlsx"), &ReferenceConfig::default())
            .unwrap_err();
        assert!(matches!(err, ReferenceError::Workbook(_)));
    }
}
