//! Page-local failures.

use std::fmt;

use serde::Serialize;

use crate::error::ExtractionError;

/// Why a page ended up on the double-check list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageIssueKind {
    /// The page could not be read or a value could not be parsed.
    Extraction,
    /// Invoice number, date or another required header field is missing.
    MissingMetadata,
    /// A continuation page names another invoice than the one in progress.
    ContinuationMismatch,
    /// A declared discount disagrees with the recomputed one.
    Reconciliation,
    /// The column fixing the item count is absent or empty.
    MissingAnchor,
    /// The item table does not have the expected shape.
    SchemaShape,
    /// The page was read but filtered out by a vendor rule.
    Rejected,
    /// No item table, or an empty one.
    EmptyTable,
    /// An article could not be matched to a customs code.
    UnresolvedArticle,
    /// An item failed model validation and was dropped.
    InvalidItem,
    /// A declaration failed model validation and was omitted.
    InvalidDeclaration,
}

impl fmt::Display for PageIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extraction => "extraction",
            Self::MissingMetadata => "missing metadata",
            Self::ContinuationMismatch => "continuation mismatch",
            Self::Reconciliation => "reconciliation",
            Self::MissingAnchor => "missing anchor",
            Self::SchemaShape => "schema shape",
            Self::Rejected => "rejected",
            Self::EmptyTable => "empty table",
            Self::UnresolvedArticle => "unresolved article",
            Self::InvalidItem => "invalid item",
            Self::InvalidDeclaration => "invalid declaration",
        };
        f.write_str(name)
    }
}

/// A page that needs manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageIssue {
    pub page: u32,
    pub kind: PageIssueKind,
    pub detail: String,
}

impl PageIssue {
    pub fn new(page: u32, kind: PageIssueKind, detail: impl Into<String>) -> Self {
        Self {
            page,
            kind,
            detail: detail.into(),
        }
    }

    /// Classify an extraction failure on `page`.
    pub fn from_error(page: u32, error: &ExtractionError) -> Self {
        let kind = match error {
            ExtractionError::MissingField(_) => PageIssueKind::MissingMetadata,
            ExtractionError::Parse { .. } | ExtractionError::Overflow(_) => PageIssueKind::Extraction,
            ExtractionError::Shape(_) => PageIssueKind::SchemaShape,
            ExtractionError::MissingAnchor(_) => PageIssueKind::MissingAnchor,
            ExtractionError::Reconciliation { .. } => PageIssueKind::Reconciliation,
            ExtractionError::ContinuationMismatch { .. } => PageIssueKind::ContinuationMismatch,
            ExtractionError::NoData => PageIssueKind::EmptyTable,
        };
        Self::new(page, kind, error.to_string())
    }
}

impl fmt::Display for PageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}: {}: {}", self.page, self.kind, self.detail)
    }
}

/// Sorted, de-duplicated page numbers of `issues`.
pub fn pages_to_double_check(issues: &[PageIssue]) -> Vec<u32> {
    let mut pages: Vec<u32> = issues.iter().map(|i| i.page).collect();
    pages.sort_unstable();
    pages.dedup();
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pages_are_sorted_and_unique() {
        let issues = vec![
            PageIssue::new(4, PageIssueKind::Rejected, "FR destination"),
            PageIssue::new(2, PageIssueKind::UnresolvedArticle, "XYZ"),
            PageIssue::new(4, PageIssueKind::UnresolvedArticle, "ABC"),
        ];
        assert_eq!(pages_to_double_check(&issues), vec![2, 4]);
        assert!(pages_to_double_check(&[]).is_empty());
    }

    #[test]
    fn test_error_classification() {
        let issue = PageIssue::from_error(3, &ExtractionError::MissingAnchor("P.U. HT".to_string()));
        assert_eq!(issue.kind, PageIssueKind::MissingAnchor);
        assert_eq!(issue.page, 3);

        let issue = PageIssue::from_error(
            1,
            &ExtractionError::Reconciliation {
                row: 0,
                expected: "1.00".to_string(),
                declared: "2.00".to_string(),
            },
        );
        assert_eq!(issue.kind, PageIssueKind::Reconciliation);
        assert_eq!(issue.to_string(), "page 1: reconciliation: discount reconciliation failed on row 0: expected 1.00, declared 2.00");
    }
}
