//! Page geometry: absolute boxes, page-relative regions and ruling edges.
//!
//! All coordinates use a top-left origin measured in PDF points, the same
//! convention invoice layouts are described in.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in page coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0: x0.min(x1),
            top: top.min(bottom),
            x1: x0.max(x1),
            bottom: top.max(bottom),
        }
    }

    /// Get the width of the box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Get the height of the box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Get the center point of the box.
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Check if a point is inside this box (edges included).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.top && y <= self.bottom
    }

    /// Check if this box overlaps with another (touching counts).
    pub fn intersects(&self, other: &BBox) -> bool {
        self.x0 <= other.x1 && self.x1 >= other.x0 && self.top <= other.bottom && self.bottom >= other.top
    }

    /// Intersection of two boxes, if any.
    pub fn clip(&self, other: &BBox) -> Option<BBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BBox {
            x0: self.x0.max(other.x0),
            top: self.top.max(other.top),
            x1: self.x1.min(other.x1),
            bottom: self.bottom.min(other.bottom),
        })
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// A region expressed as fractions of the page width and height.
///
/// Vendors print on different paper sizes, so layouts are described
/// relative to the page rather than in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl RelativeBox {
    /// The whole page.
    pub const FULL: RelativeBox = RelativeBox {
        x0: 0.0,
        top: 0.0,
        x1: 1.0,
        bottom: 1.0,
    };

    pub const fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self { x0, top, x1, bottom }
    }

    /// Resolve against concrete page dimensions.
    pub fn to_bbox(&self, width: f64, height: f64) -> BBox {
        BBox::new(
            self.x0 * width,
            self.top * height,
            self.x1 * width,
            self.bottom * height,
        )
    }
}

/// Orientation of a ruling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned ruling segment drawn on the page (table borders).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl Edge {
    pub fn horizontal(x0: f64, x1: f64, y: f64) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            x0: x0.min(x1),
            top: y,
            x1: x0.max(x1),
            bottom: y,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64) -> Self {
        Self {
            orientation: Orientation::Vertical,
            x0: x,
            top: top.min(bottom),
            x1: x,
            bottom: top.max(bottom),
        }
    }

    /// Length along the edge's orientation.
    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }

    /// Clip the edge to a box, keeping its orientation.
    pub fn clip(&self, bbox: &BBox) -> Option<Edge> {
        let clipped = self.bbox().clip(bbox)?;
        let edge = match self.orientation {
            Orientation::Horizontal => Edge::horizontal(clipped.x0, clipped.x1, self.top),
            Orientation::Vertical => Edge::vertical(self.x0, clipped.top, clipped.bottom),
        };
        Some(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_box_scales_with_page() {
        let region = RelativeBox::new(0.5, 0.10, 1.0, 0.28);
        let a4 = region.to_bbox(595.32, 841.92);
        assert!((a4.x0 - 297.66).abs() < 1e-9);
        assert!((a4.bottom - 235.7376).abs() < 1e-9);

        let letter = region.to_bbox(612.0, 792.0);
        assert!((letter.x0 - 306.0).abs() < 1e-9);
        assert!((letter.top - 79.2).abs() < 1e-9);
    }

    #[test]
    fn test_bbox_clip_and_contains() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 20.0, 20.0);
        assert_eq!(a.clip(&b), Some(BBox::new(5.0, 5.0, 10.0, 10.0)));
        assert!(a.contains_point(10.0, 0.0));
        assert!(!a.contains_point(10.1, 0.0));
        assert!(a.clip(&BBox::new(11.0, 11.0, 12.0, 12.0)).is_none());
    }

    #[test]
    fn test_edge_clip_keeps_orientation() {
        let edge = Edge::horizontal(0.0, 100.0, 50.0);
        let clipped = edge.clip(&BBox::new(20.0, 0.0, 60.0, 80.0)).unwrap();
        assert_eq!(clipped.orientation, Orientation::Horizontal);
        assert_eq!((clipped.x0, clipped.x1), (20.0, 60.0));
        assert!(edge.clip(&BBox::new(0.0, 60.0, 100.0, 80.0)).is_none());
    }
}
