//! PDF processing module.
//!
//! Pages are interpreted into positioned glyphs and ruling edges; the
//! [`PageExtractor`] then reads text lines and ruled tables from regions
//! given as fractions of the page size.

mod content;
pub(crate) mod document;
mod font;
mod geometry;
mod lines;
pub(crate) mod page;
pub(crate) mod table;

pub use content::Matrix;
pub use document::PdfDocument;
pub use geometry::{BBox, Edge, Orientation, RelativeBox};
pub use lines::{LineOptions, TextLine};
pub use page::{Glyph, Page};
pub use table::{Table, TableGrid, TableSettings};

use crate::error::PdfError;
use crate::models::ExtractionConfig;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Reads lines and tables from page regions.
///
/// Extraction is a pure function of the page content and the region; nothing
/// is cached between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageExtractor {
    lines: LineOptions,
    tables: TableSettings,
}

impl PageExtractor {
    /// Create an extractor with default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor from the extraction section of the configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            lines: LineOptions {
                y_tolerance: config.line_y_tolerance,
                word_gap: config.word_gap,
            },
            tables: TableSettings {
                snap_tolerance: config.snap_tolerance,
                join_tolerance: config.join_tolerance,
                intersection_tolerance: config.intersection_tolerance,
                edge_min_length: config.edge_min_length,
            },
        }
    }

    /// Set line grouping tolerances.
    pub fn with_line_options(mut self, options: LineOptions) -> Self {
        self.lines = options;
        self
    }

    /// Set table detection tolerances.
    pub fn with_table_settings(mut self, settings: TableSettings) -> Self {
        self.tables = settings;
        self
    }

    /// Text lines inside `region`, top to bottom.
    pub fn extract_lines(&self, page: &Page, region: RelativeBox) -> Vec<String> {
        page.crop_relative(region)
            .text_lines(&self.lines)
            .into_iter()
            .map(|l| l.text)
            .collect()
    }

    /// Every text line of the page.
    pub fn extract_text_lines(&self, page: &Page) -> Vec<String> {
        self.extract_lines(page, RelativeBox::FULL)
    }

    /// All ruled tables inside `region` (or the whole page), ordered top to
    /// bottom then left to right.
    pub fn extract_tables(&self, page: &Page, region: Option<RelativeBox>) -> Vec<TableGrid> {
        let view = page.crop_relative(region.unwrap_or(RelativeBox::FULL));
        view.find_tables(&self.tables)
            .iter()
            .map(|table| table.extract(&view, &self.lines))
            .collect()
    }

    /// The first ruled table inside `region`, if any.
    pub fn extract_table(&self, page: &Page, region: Option<RelativeBox>) -> Option<TableGrid> {
        self.extract_tables(page, region).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page::tests::glyph_run;
    use crate::pdf::table::tests::{cell_text, grid_edges};
    use pretty_assertions::assert_eq;

    fn invoice_page() -> Page {
        let mut glyphs = glyph_run("DOLVIKA", 20.0, 20.0);
        glyphs.extend(glyph_run("FRANCE", 400.0, 120.0));
        glyphs.extend(cell_text(&["Code"], 25.0, 405.0));
        glyphs.extend(cell_text(&["Qte"], 125.0, 405.0));
        glyphs.extend(cell_text(&["1234", "5678"], 25.0, 425.0));
        glyphs.extend(cell_text(&["2,00", "3,00"], 125.0, 425.0));
        let edges = grid_edges(&[20.0, 120.0, 220.0], &[400.0, 420.0, 480.0]);
        Page::new(1, 595.0, 842.0, glyphs, edges)
    }

    #[test]
    fn test_extract_lines_from_region() {
        let page = invoice_page();
        let extractor = PageExtractor::new();
        assert_eq!(
            extractor.extract_lines(&page, RelativeBox::new(0.5, 0.10, 1.0, 0.28)),
            vec!["FRANCE".to_string()]
        );
        assert_eq!(extractor.extract_text_lines(&page)[0], "DOLVIKA");
    }

    #[test]
    fn test_extract_table_in_region() {
        let page = invoice_page();
        let extractor = PageExtractor::new();
        let table = extractor.extract_table(&page, Some(RelativeBox::new(0.0, 0.4, 1.0, 1.0))).unwrap();
        assert_eq!(
            table,
            vec![
                vec![Some("Code".to_string()), Some("Qte".to_string())],
                vec![Some("1234\n5678".to_string()), Some("2,00\n3,00".to_string())],
            ]
        );
        // The header region holds no ruling.
        assert!(extractor.extract_table(&page, Some(RelativeBox::new(0.0, 0.0, 1.0, 0.3))).is_none());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let page = invoice_page();
        let extractor = PageExtractor::new();
        assert_eq!(extractor.extract_tables(&page, None), extractor.extract_tables(&page, None));
    }
}
