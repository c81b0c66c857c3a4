//! Grouping of glyphs into text lines.

use serde::{Deserialize, Serialize};

use super::geometry::BBox;
use super::page::Glyph;

/// Tolerances used when assembling lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineOptions {
    /// Glyphs whose tops differ by at most this much share a line.
    pub y_tolerance: f64,
    /// Horizontal gap above which a space is inserted between glyphs.
    pub word_gap: f64,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            y_tolerance: 3.0,
            word_gap: 3.0,
        }
    }
}

/// A line of text with its extent.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub bbox: BBox,
}

/// Cluster glyphs into lines ordered top to bottom, each read left to right.
pub fn cluster_lines(glyphs: &[Glyph], options: &LineOptions) -> Vec<TextLine> {
    let mut sorted: Vec<&Glyph> = glyphs.iter().collect();
    sorted.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut clusters: Vec<Vec<&Glyph>> = Vec::new();
    let mut last_top = f64::NEG_INFINITY;
    for glyph in sorted {
        match clusters.last_mut() {
            Some(cluster) if glyph.bbox.top - last_top <= options.y_tolerance => cluster.push(glyph),
            _ => clusters.push(vec![glyph]),
        }
        last_top = glyph.bbox.top;
    }

    clusters
        .into_iter()
        .filter_map(|mut cluster| {
            cluster.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            assemble_line(&cluster, options)
        })
        .collect()
}

fn assemble_line(glyphs: &[&Glyph], options: &LineOptions) -> Option<TextLine> {
    let mut text = String::new();
    let mut bbox: Option<BBox> = None;
    let mut previous: Option<&Glyph> = None;

    for glyph in glyphs {
        if let Some(prev) = previous {
            let gap = glyph.bbox.x0 - prev.bbox.x1;
            if gap > options.word_gap && !prev.is_blank() && !glyph.is_blank() {
                text.push(' ');
            }
        }
        text.push_str(&glyph.text);
        bbox = Some(match bbox {
            Some(b) => b.union(&glyph.bbox),
            None => glyph.bbox,
        });
        previous = Some(glyph);
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    bbox.map(|bbox| TextLine { text: collapsed, bbox })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page::tests::glyph_run;

    #[test]
    fn test_lines_are_ordered_and_spaced() {
        let mut glyphs = glyph_run("Facture", 300.0, 100.0);
        glyphs.extend(glyph_run("N°", 340.0, 101.5));
        glyphs.extend(glyph_run("FA000123 15/03/2024", 10.0, 120.0));

        let lines = cluster_lines(&glyphs, &LineOptions::default());
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Facture N°", "FA000123 15/03/2024"]);
        assert_eq!(lines[0].bbox.x0, 300.0);
    }

    #[test]
    fn test_blank_glyphs_do_not_double_spaces() {
        let glyphs = glyph_run("A  B", 0.0, 0.0);
        let lines = cluster_lines(&glyphs, &LineOptions::default());
        assert_eq!(lines[0].text, "A B");
    }

    #[test]
    fn test_whitespace_only_lines_are_dropped() {
        let glyphs = glyph_run("   ", 0.0, 0.0);
        assert!(cluster_lines(&glyphs, &LineOptions::default()).is_empty());
    }
}
