//! PDF loading and page interpretation using lopdf, with pdf-extract as a
//! plain-text fallback.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::content::Interpreter;
use super::font::number;
use super::page::Page;
use super::Result;
use crate::error::PdfError;

/// A4 portrait, used when a page declares no usable media box.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 595.0, 842.0];

/// A loaded PDF document.
pub struct PdfDocument {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfDocument {
    /// Read and load a PDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref()).map_err(|e| PdfError::Parse(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::load(&data)
    }

    /// Load a PDF from bytes.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // Keep the decrypted bytes for pdf_extract
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted_data
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self {
            document: doc,
            raw_data,
        })
    }

    /// Get the number of pages in the PDF.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Interpret one page (1-indexed) into glyphs and ruling edges.
    pub fn page(&self, number: u32) -> Result<Page> {
        let doc = &self.document;
        let page_id = *doc.get_pages().get(&number).ok_or(PdfError::InvalidPage(number))?;

        let [x0, y0, x1, y1] = self.media_box(page_id);
        let (width, height) = (x1 - x0, y1 - y0);
        trace!("Page {} media box {}x{}", number, width, height);

        let content = doc.get_page_content(page_id).map_err(|e| PdfError::Content {
            page: number,
            reason: e.to_string(),
        })?;
        let resources = self.get_page_resources(page_id).unwrap_or_default();

        let out = Interpreter::new(doc, height, (x0, y0))
            .run(&content, &resources)
            .map_err(|reason| PdfError::Content { page: number, reason })?;

        Ok(Page::new(number, width, height, out.glyphs, out.edges))
    }

    /// Interpret every page in document order.
    pub fn pages(&self) -> Result<Vec<Page>> {
        (1..=self.page_count()).map(|n| self.page(n)).collect()
    }

    /// Extract plain text from the entire PDF with pdf-extract.
    pub fn extract_text(&self) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        Ok(text)
    }

    fn media_box(&self, page_id: ObjectId) -> [f64; 4] {
        let Some(Object::Array(values)) = self.get_inherited(page_id, b"MediaBox") else {
            return DEFAULT_MEDIA_BOX;
        };
        let values: Vec<f64> = values
            .iter()
            .filter_map(|v| self.document.dereference(v).ok().and_then(|(_, o)| number(o)))
            .collect();
        match values.as_slice() {
            [x0, y0, x1, y1] if x1 > x0 && y1 > y0 => [*x0, *y0, *x1, *y1],
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    /// Get resources dictionary for a page, handling inheritance
    fn get_page_resources(&self, page_id: ObjectId) -> Option<Dictionary> {
        match self.get_inherited(page_id, b"Resources")? {
            Object::Dictionary(dict) => Some(dict.clone()),
            _ => None,
        }
    }

    /// Look up a page attribute, walking up the page tree until found.
    fn get_inherited(&self, node_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let doc = &self.document;
        let node = doc.get_object(node_id).ok()?;
        if let Object::Dictionary(dict) = node {
            if let Ok(value) = dict.get(key) {
                if let Ok((_, resolved)) = doc.dereference(value) {
                    return Some(resolved);
                }
            }

            // Continue up the tree
            if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
                return self.get_inherited(*parent_id, key);
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// Build a one-page PDF whose resources and media box live on the page
    /// tree root.
    pub(crate) fn sample_pdf(operations: Vec<Operation>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    #[test]
    fn test_load_interprets_text_and_rules() {
        let data = sample_pdf(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![12.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("Facture N 42")]),
            Operation::new("T*", vec![]),
            Operation::new("Tj", vec![Object::string_literal("Total")]),
            Operation::new("ET", vec![]),
            Operation::new("re", vec![50.into(), 500.into(), 200.into(), 100.into()]),
            Operation::new("S", vec![]),
        ]);

        let pdf = PdfDocument::load(&data).unwrap();
        assert_eq!(pdf.page_count(), 1);

        let page = pdf.page(1).unwrap();
        assert_eq!((page.width(), page.height()), (595.0, 842.0));
        assert_eq!(page.text(), "Facture N 42\nTotal");

        let first = &page.glyphs()[0];
        assert!((first.bbox.x0 - 100.0).abs() < 1e-6);
        assert!((first.bbox.top - (842.0 - 708.0)).abs() < 1e-6);
        assert!((first.bbox.width() - 5.0).abs() < 1e-6);

        assert_eq!(page.edges().len(), 4);
        assert!(matches!(pdf.page(2), Err(PdfError::InvalidPage(2))));
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(PdfDocument::load(b"not a pdf"), Err(PdfError::Parse(_))));
    }
}
