//! Vendor invoice readers.
//!
//! A single [`InvoiceReader`] handles every vendor; what differs between
//! vendors lives in a [`VendorProfile`]. Per page the reader extracts the
//! header with [`MetadataParser`] and the item rows with
//! [`LineItemParser`], keeping cross-page state in a [`DocumentContext`].

mod context;
mod countries;
mod issue;
mod line_items;
mod metadata;
pub mod numbers;
mod patterns;
mod profile;
mod reader;
mod vendors;

pub use context::DocumentContext;
pub use countries::{code_for_name, is_country_line, vat_country};
pub use issue::{pages_to_double_check, PageIssue, PageIssueKind};
pub use line_items::{pad_or_truncate, remove_empty_rows, repair_descriptions, LineItem, LineItemParser};
pub use metadata::{MetadataParser, PageHeader};
pub use patterns::ProfilePatterns;
pub use profile::{
    CodeOverride, ColumnRoles, CountryRule, DeclarationIdStrategy, ExceptionTables, LineItemLayout,
    MetadataLayout, NatureCodes, PartyInfo, PartyTag, VatLocator, VendorProfile,
};
pub use reader::{DocumentOutcome, InvoiceReader, RunOptions, RunReport};
pub use vendors::{builtin_profiles, ProfileRegistry, PLACEHOLDER_PARTY_ID};

use crate::error::ExtractionError;

/// Result type for page-level extraction.
pub type Result<T> = std::result::Result<T, ExtractionError>;
