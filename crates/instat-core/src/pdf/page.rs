//! Positioned page content: glyphs and ruling edges.

use super::geometry::{BBox, Edge, RelativeBox};
use super::lines::{cluster_lines, LineOptions, TextLine};
use super::table::{find_tables, Table, TableSettings};

/// A single decoded glyph with its box on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Decoded text (usually one character, ligatures may carry more).
    pub text: String,
    /// Glyph box in page coordinates.
    pub bbox: BBox,
    /// Effective font size in points.
    pub size: f64,
}

impl Glyph {
    pub fn new(text: impl Into<String>, bbox: BBox, size: f64) -> Self {
        Self {
            text: text.into(),
            bbox,
            size,
        }
    }

    /// Whether the glyph only carries whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Content of one PDF page, or of a cropped region of it.
#[derive(Debug, Clone)]
pub struct Page {
    number: u32,
    width: f64,
    height: f64,
    bbox: BBox,
    glyphs: Vec<Glyph>,
    edges: Vec<Edge>,
}

impl Page {
    /// Create a page from already positioned content.
    pub fn new(number: u32, width: f64, height: f64, glyphs: Vec<Glyph>, edges: Vec<Edge>) -> Self {
        Self {
            number,
            width,
            height,
            bbox: BBox::new(0.0, 0.0, width, height),
            glyphs,
            edges,
        }
    }

    /// Page number (1-indexed).
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Full page width in points.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Full page height in points.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Region this view covers.
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Restrict the page to a region. Glyphs are kept when their center lies
    /// inside the region; edges are clipped.
    pub fn crop(&self, bbox: BBox) -> Page {
        let bbox = self.bbox.clip(&bbox).unwrap_or(BBox::new(bbox.x0, bbox.top, bbox.x0, bbox.top));
        let glyphs = self
            .glyphs
            .iter()
            .filter(|g| {
                let (x, y) = g.bbox.center();
                bbox.contains_point(x, y)
            })
            .cloned()
            .collect();
        let edges = self.edges.iter().filter_map(|e| e.clip(&bbox)).collect();

        Page {
            number: self.number,
            width: self.width,
            height: self.height,
            bbox,
            glyphs,
            edges,
        }
    }

    /// Restrict the page to a region given as fractions of the page size.
    pub fn crop_relative(&self, region: RelativeBox) -> Page {
        self.crop(region.to_bbox(self.width, self.height))
    }

    /// Group glyphs into text lines, top to bottom.
    pub fn text_lines(&self, options: &LineOptions) -> Vec<TextLine> {
        cluster_lines(&self.glyphs, options)
    }

    /// All text of this view, one line per row.
    pub fn text(&self) -> String {
        self.text_lines(&LineOptions::default())
            .into_iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Detect ruled tables in this view.
    pub fn find_tables(&self, settings: &TableSettings) -> Vec<Table> {
        find_tables(&self.edges, settings)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Lay out `text` as monospaced glyphs starting at (x, top).
    pub(crate) fn glyph_run(text: &str, x: f64, top: f64) -> Vec<Glyph> {
        let advance = 5.0;
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f64 * advance;
                Glyph::new(c.to_string(), BBox::new(x0, top, x0 + advance, top + 10.0), 10.0)
            })
            .collect()
    }

    #[test]
    fn test_crop_keeps_glyph_centers_inside() {
        let mut glyphs = glyph_run("LEFT", 10.0, 10.0);
        glyphs.extend(glyph_run("RIGHT", 400.0, 10.0));
        let page = Page::new(1, 595.0, 842.0, glyphs, vec![]);

        let right = page.crop_relative(RelativeBox::new(0.5, 0.0, 1.0, 0.1));
        assert_eq!(right.text(), "RIGHT");
        assert_eq!(right.number(), 1);
        assert_eq!(page.text(), "LEFT RIGHT");
    }
}
