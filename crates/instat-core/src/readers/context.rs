//! Per-document state threaded through the page loop.

use std::collections::BTreeMap;

use tracing::{debug, error};

use super::issue::{pages_to_double_check, PageIssue};
use crate::error::ExtractionError;
use crate::models::InvoiceMetadata;

/// Metadata seen so far in one document and the pages needing review.
///
/// Pages are processed in document order; a continuation page can only
/// refer to the invoice read on an earlier page.
#[derive(Debug, Default)]
pub struct DocumentContext {
    invoices: BTreeMap<String, InvoiceMetadata>,
    previous: Option<InvoiceMetadata>,
    issues: Vec<PageIssue>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record metadata read from a page. The first metadata seen for an
    /// invoice number is kept and returned for every later page.
    pub fn remember(&mut self, metadata: InvoiceMetadata) -> InvoiceMetadata {
        let cached = self
            .invoices
            .entry(metadata.invoice_number.clone())
            .or_insert(metadata)
            .clone();
        debug!("Using metadata for invoice {}", cached.invoice_number);
        self.previous = Some(cached.clone());
        cached
    }

    /// Metadata of the invoice in progress, if `claimed` names it.
    pub fn continuation(&self, claimed: &str) -> Result<InvoiceMetadata, ExtractionError> {
        match &self.previous {
            Some(previous) if previous.invoice_number == claimed => {
                debug!("Continuation page reuses metadata of invoice {}", claimed);
                Ok(previous.clone())
            }
            other => Err(ExtractionError::ContinuationMismatch {
                claimed: claimed.to_string(),
                cached: other.as_ref().map(|m| m.invoice_number.clone()),
            }),
        }
    }

    /// Put a page on the double-check list.
    pub fn flag(&mut self, issue: PageIssue) {
        error!("{}", issue);
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[PageIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<PageIssue> {
        self.issues
    }

    pub fn pages_to_double_check(&self) -> Vec<u32> {
        pages_to_double_check(&self.issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::PageIssueKind;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn metadata(number: &str, vat: &str) -> InvoiceMetadata {
        InvoiceMetadata::new(number, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).with_vat_id(vat)
    }

    #[test]
    fn test_first_seen_metadata_wins() {
        let mut ctx = DocumentContext::new();
        ctx.remember(metadata("FA001", "ES1"));
        let again = ctx.remember(metadata("FA001", "IT2"));
        assert_eq!(again.vat_id.as_deref(), Some("ES1"));
    }

    #[test]
    fn test_continuation() {
        let mut ctx = DocumentContext::new();
        assert!(matches!(
            ctx.continuation("FA001"),
            Err(ExtractionError::ContinuationMismatch { cached: None, .. })
        ));

        ctx.remember(metadata("FA001", "ES1"));
        assert_eq!(ctx.continuation("FA001").unwrap().invoice_number, "FA001");
        let err = ctx.continuation("FA002").unwrap_err();
        assert_eq!(
            err,
            ExtractionError::ContinuationMismatch {
                claimed: "FA002".to_string(),
                cached: Some("FA001".to_string()),
            }
        );
    }

    #[test]
    fn test_flagged_pages() {
        let mut ctx = DocumentContext::new();
        ctx.flag(PageIssue::new(3, PageIssueKind::EmptyTable, "no item table"));
        ctx.flag(PageIssue::new(1, PageIssueKind::Rejected, "FR destination"));
        assert_eq!(ctx.pages_to_double_check(), vec![1, 3]);
        assert_eq!(ctx.into_issues().len(), 2);
    }
}
