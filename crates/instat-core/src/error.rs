//! Error types for the instat-core library.

use thiserror::Error;

/// Main error type for the instat library.
///
/// Only run-level failures travel through this type. Failures confined to a
/// single page or item are recorded as [`crate::readers::PageIssue`] values
/// and never abort a document.
#[derive(Error, Debug)]
pub enum InstatError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Declaration model constraint violated.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// XML serialization or schema error.
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// Reference spreadsheet error.
    #[error("reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// Tabular export error.
    #[error("export error: {0}")]
    Export(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The first page does not carry the expected party name.
    #[error("{party} not found on page {page}, probably wrong input document")]
    WrongDocument { party: String, page: u32 },

    /// Extracted records without an invoice number cannot be grouped.
    #[error("record from page {page} has no invoice number")]
    NullInvoiceNumber { page: u32 },
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to interpret a page content stream.
    #[error("failed to read content of page {page}: {reason}")]
    Content { page: u32, reason: String },

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to invoice field extraction on a single page.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Required field is missing.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Failed to parse a value.
    #[error("failed to parse {field}: {value:?}")]
    Parse { field: String, value: String },

    /// The extracted table does not have the expected shape.
    #[error("table shape mismatch: {0}")]
    Shape(String),

    /// The anchor column that fixes the item count is absent or empty.
    #[error("anchor column {0:?} missing or empty")]
    MissingAnchor(String),

    /// A declared discount does not match quantity x unit price x rate.
    #[error("discount reconciliation failed on row {row}: expected {expected}, declared {declared}")]
    Reconciliation {
        row: usize,
        expected: String,
        declared: String,
    },

    /// A continuation page names a different invoice than the cached one.
    #[error("continuation page claims invoice {claimed} but cached metadata is for {cached:?}")]
    ContinuationMismatch {
        claimed: String,
        cached: Option<String>,
    },

    /// Amounts too large for decimal arithmetic.
    #[error("amount overflow in {0}")]
    Overflow(String),

    /// No invoice data could be extracted.
    #[error("no invoice data found")]
    NoData,
}

/// A field-level constraint violation raised while constructing the
/// declaration model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{entity}.{field}: {constraint} (got {value:?})")]
pub struct ModelError {
    /// Model type being constructed.
    pub entity: &'static str,
    /// Offending field, named as in the XML output.
    pub field: &'static str,
    /// Human readable constraint.
    pub constraint: String,
    /// Rejected value.
    pub value: String,
}

impl ModelError {
    pub fn new(
        entity: &'static str,
        field: &'static str,
        constraint: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            entity,
            field,
            constraint: constraint.into(),
            value: value.to_string(),
        }
    }
}

/// Errors related to XML output and schema handling.
#[derive(Error, Debug)]
pub enum XmlError {
    /// Failed to serialize the model.
    #[error("failed to serialize: {0}")]
    Serialize(String),

    /// Failed to parse an XML document.
    #[error("failed to parse XML: {0}")]
    Parse(String),

    /// The schema document uses constructs outside the supported subset or
    /// references undefined types.
    #[error("invalid schema: {0}")]
    Schema(String),
}

/// Errors related to the reference spreadsheet.
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// The workbook could not be opened or read.
    #[error("failed to read workbook: {0}")]
    Workbook(String),

    /// A required sheet is missing.
    #[error("missing sheet {0:?}")]
    MissingSheet(String),

    /// A required column is missing from a sheet.
    #[error("missing column {column:?} in sheet {sheet:?}")]
    MissingColumn { sheet: String, column: String },

    /// A customs code is not 8 characters long.
    #[error("article {article:?} has malformed customs code {code:?}")]
    MalformedCode { article: String, code: String },

    /// A CSV reference could not be read.
    #[error("failed to read CSV reference: {0}")]
    Csv(String),
}

/// Result type for the instat library.
pub type Result<T> = std::result::Result<T, InstatError>;
