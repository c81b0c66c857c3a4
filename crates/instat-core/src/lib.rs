//! Core library for INSTAT customs declarations built from vendor invoice PDFs.
//!
//! This crate provides:
//! - PDF page extraction (positioned text lines and ruled tables)
//! - Vendor profiles and the invoice reader (header and item table parsing)
//! - Article reference loading and fuzzy name resolution
//! - Declaration assembly into the INSTAT envelope model
//! - XML serialization with schema validation, and XLSX/CSV export

pub mod articles;
pub mod declaration;
pub mod error;
pub mod export;
pub mod models;
pub mod pdf;
pub mod readers;
pub mod xml;

pub use articles::{ArticleReference, ArticleResolver};
pub use declaration::{Clock, DeclarationAssembler, FixedClock, SystemClock};
pub use error::{InstatError, Result};
pub use export::{write_csv, write_xlsx, ExportRow};
pub use models::{Declaration, Envelope, Instat, InstatConfig, Item, Party, RawPageRecord};
pub use pdf::{PageExtractor, PdfDocument};
pub use readers::{
    DocumentOutcome, InvoiceReader, PageIssue, PageIssueKind, ProfileRegistry, RunOptions, RunReport,
    VendorProfile,
};
pub use xml::{to_xml, validate_xml, Schema, ValidationReport};
