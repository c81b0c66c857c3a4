//! Ruled table detection.
//!
//! Tables are recovered from the ruling edges drawn on the page: edges are
//! snapped and joined, their intersections give cell corners, minimal cells
//! are built from connected corners and cells sharing corners form a table.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::geometry::{BBox, Edge, Orientation};
use super::lines::{cluster_lines, LineOptions};
use super::page::Page;

/// Tolerances for lattice table detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Parallel edges closer than this are aligned to their mean position.
    pub snap_tolerance: f64,
    /// Collinear edges separated by at most this much are merged.
    pub join_tolerance: f64,
    /// Slack when testing whether two edges cross.
    pub intersection_tolerance: f64,
    /// Edges shorter than this are ignored.
    pub edge_min_length: f64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
            edge_min_length: 3.0,
        }
    }
}

/// Extracted cell grid: one entry per row, `None` where a merged cell
/// covers the position.
pub type TableGrid = Vec<Vec<Option<String>>>;

/// A detected table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Extent of the table.
    pub bbox: BBox,
    /// Cells laid out by row; merged positions are `None`.
    pub rows: Vec<Vec<Option<BBox>>>,
}

impl Table {
    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Read the text of every cell. Lines inside a cell are joined by `\n`.
    pub fn extract(&self, page: &Page, options: &LineOptions) -> TableGrid {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.map(|bbox| {
                            let inside: Vec<_> = page
                                .glyphs()
                                .iter()
                                .filter(|g| {
                                    let (x, y) = g.bbox.center();
                                    bbox.contains_point(x, y)
                                })
                                .cloned()
                                .collect();
                            cluster_lines(&inside, options)
                                .into_iter()
                                .map(|l| l.text)
                                .collect::<Vec<_>>()
                                .join("\n")
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

/// Find ruled tables from a set of edges, ordered top to bottom then left
/// to right.
pub fn find_tables(edges: &[Edge], settings: &TableSettings) -> Vec<Table> {
    let edges = merge_edges(edges, settings);
    let points = intersections(&edges, settings.intersection_tolerance);
    let cells = build_cells(&points);
    trace!("{} edges, {} intersections, {} cells", edges.len(), points.len(), cells.len());

    let mut tables: Vec<Table> = group_cells(&cells)
        .into_iter()
        .filter(|group| group.len() > 1)
        .map(|group| layout_table(&group))
        .collect();
    tables.sort_by(|a, b| a.bbox.top.total_cmp(&b.bbox.top).then(a.bbox.x0.total_cmp(&b.bbox.x0)));
    tables
}

fn merge_edges(edges: &[Edge], settings: &TableSettings) -> Vec<Edge> {
    let mut horizontal: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal)
        .copied()
        .collect();
    let mut vertical: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Vertical)
        .copied()
        .collect();

    snap(&mut horizontal, settings.snap_tolerance, |e| e.top, |e, v| {
        e.top = v;
        e.bottom = v;
    });
    snap(&mut vertical, settings.snap_tolerance, |e| e.x0, |e, v| {
        e.x0 = v;
        e.x1 = v;
    });

    let mut merged = join(horizontal, settings.join_tolerance, Orientation::Horizontal);
    merged.extend(join(vertical, settings.join_tolerance, Orientation::Vertical));
    merged.retain(|e| e.length() >= settings.edge_min_length);
    merged
}

/// Align edges whose positions cluster within `tolerance` to the cluster mean.
fn snap(
    edges: &mut [Edge],
    tolerance: f64,
    position: impl Fn(&Edge) -> f64,
    set: impl Fn(&mut Edge, f64),
) {
    edges.sort_by(|a, b| position(a).total_cmp(&position(b)));
    let mut start = 0;
    while start < edges.len() {
        let mut end = start + 1;
        while end < edges.len() && position(&edges[end]) - position(&edges[end - 1]) <= tolerance {
            end += 1;
        }
        let mean = edges[start..end].iter().map(&position).sum::<f64>() / (end - start) as f64;
        for edge in &mut edges[start..end] {
            set(edge, mean);
        }
        start = end;
    }
}

/// Merge collinear edges that overlap or nearly touch.
fn join(edges: Vec<Edge>, tolerance: f64, orientation: Orientation) -> Vec<Edge> {
    let key = |e: &Edge| match orientation {
        Orientation::Horizontal => e.top,
        Orientation::Vertical => e.x0,
    };
    let lo = |e: &Edge| match orientation {
        Orientation::Horizontal => e.x0,
        Orientation::Vertical => e.top,
    };
    let hi = |e: &Edge| match orientation {
        Orientation::Horizontal => e.x1,
        Orientation::Vertical => e.bottom,
    };

    let mut by_line: BTreeMap<i64, Vec<Edge>> = BTreeMap::new();
    for edge in edges {
        by_line.entry(point_key(key(&edge))).or_default().push(edge);
    }

    let mut out = Vec::new();
    for (_, mut line) in by_line {
        line.sort_by(|a, b| lo(a).total_cmp(&lo(b)));
        let mut current = line[0];
        for edge in line.into_iter().skip(1) {
            if lo(&edge) <= hi(&current) + tolerance {
                current = extend(current, hi(&edge), orientation);
            } else {
                out.push(current);
                current = edge;
            }
        }
        out.push(current);
    }
    out
}

fn extend(edge: Edge, end: f64, orientation: Orientation) -> Edge {
    match orientation {
        Orientation::Horizontal => Edge::horizontal(edge.x0, edge.x1.max(end), edge.top),
        Orientation::Vertical => Edge::vertical(edge.x0, edge.top, edge.bottom.max(end)),
    }
}

/// Positions are compared at 1/1000 pt resolution.
fn point_key(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

#[derive(Debug, Default, Clone)]
struct Corner {
    x: f64,
    y: f64,
    vertical: Vec<usize>,
    horizontal: Vec<usize>,
}

type CornerMap = BTreeMap<(i64, i64), Corner>;

fn intersections(edges: &[Edge], tolerance: f64) -> CornerMap {
    let mut points = CornerMap::new();
    for (vi, v) in edges.iter().enumerate().filter(|(_, e)| e.orientation == Orientation::Vertical) {
        for (hi, h) in edges.iter().enumerate().filter(|(_, e)| e.orientation == Orientation::Horizontal) {
            let crosses = h.top >= v.top - tolerance
                && h.top <= v.bottom + tolerance
                && v.x0 >= h.x0 - tolerance
                && v.x0 <= h.x1 + tolerance;
            if !crosses {
                continue;
            }
            let corner = points
                .entry((point_key(h.top), point_key(v.x0)))
                .or_insert_with(|| Corner {
                    x: v.x0,
                    y: h.top,
                    ..Corner::default()
                });
            corner.vertical.push(vi);
            corner.horizontal.push(hi);
        }
    }
    points
}

fn shares(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|i| b.contains(i))
}

/// Build the smallest cell anchored at each corner.
fn build_cells(points: &CornerMap) -> Vec<BBox> {
    let corners: Vec<&Corner> = points.values().collect();
    let lookup = |x: f64, y: f64| points.get(&(point_key(y), point_key(x)));

    let mut cells = Vec::new();
    for (i, p) in corners.iter().enumerate() {
        let rest = &corners[i + 1..];
        let below: Vec<&&Corner> = rest.iter().filter(|c| point_key(c.x) == point_key(p.x)).collect();
        let right: Vec<&&Corner> = rest.iter().filter(|c| point_key(c.y) == point_key(p.y)).collect();

        'search: for b in &below {
            if !shares(&p.vertical, &b.vertical) {
                continue;
            }
            for r in &right {
                if !shares(&p.horizontal, &r.horizontal) {
                    continue;
                }
                if let Some(corner) = lookup(r.x, b.y) {
                    if shares(&corner.vertical, &r.vertical) && shares(&corner.horizontal, &b.horizontal) {
                        cells.push(BBox::new(p.x, p.y, r.x, b.y));
                        break 'search;
                    }
                }
            }
        }
    }
    cells
}

/// Group cells that share at least one corner.
fn group_cells(cells: &[BBox]) -> Vec<Vec<BBox>> {
    let mut parent: Vec<usize> = (0..cells.len()).collect();
    fn find(parent: &mut [usize], i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut node = i;
        while parent[node] != root {
            let next = parent[node];
            parent[node] = root;
            node = next;
        }
        root
    }

    let mut owner: HashMap<(i64, i64), usize> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let corners = [
            (cell.x0, cell.top),
            (cell.x1, cell.top),
            (cell.x0, cell.bottom),
            (cell.x1, cell.bottom),
        ];
        for (x, y) in corners {
            let key = (point_key(x), point_key(y));
            match owner.get(&key) {
                Some(&other) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, other));
                    if a != b {
                        parent[a] = b;
                    }
                }
                None => {
                    owner.insert(key, i);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<BBox>> = BTreeMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(*cell);
    }
    groups.into_values().collect()
}

fn layout_table(cells: &[BBox]) -> Table {
    let mut columns: Vec<i64> = cells.iter().map(|c| point_key(c.x0)).collect();
    columns.sort_unstable();
    columns.dedup();

    let mut rows: BTreeMap<i64, Vec<BBox>> = BTreeMap::new();
    for cell in cells {
        rows.entry(point_key(cell.top)).or_default().push(*cell);
    }

    let bbox = cells[1..].iter().fold(cells[0], |acc, c| acc.union(c));
    let rows = rows
        .into_values()
        .map(|row_cells| {
            let mut row = vec![None; columns.len()];
            for cell in row_cells {
                if let Ok(idx) = columns.binary_search(&point_key(cell.x0)) {
                    row[idx] = Some(cell);
                }
            }
            row
        })
        .collect();

    Table { bbox, rows }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pdf::page::tests::glyph_run;
    use crate::pdf::page::Glyph;

    /// Ruling for a grid with the given column and row boundaries.
    pub(crate) fn grid_edges(xs: &[f64], ys: &[f64]) -> Vec<Edge> {
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (top, bottom) = (ys[0], ys[ys.len() - 1]);
        let mut edges: Vec<Edge> = ys.iter().map(|&y| Edge::horizontal(left, right, y)).collect();
        edges.extend(xs.iter().map(|&x| Edge::vertical(x, top, bottom)));
        edges
    }

    /// Place `lines` inside a cell, one glyph run per line.
    pub(crate) fn cell_text(lines: &[&str], x: f64, top: f64) -> Vec<Glyph> {
        lines
            .iter()
            .enumerate()
            .flat_map(|(i, line)| glyph_run(line, x, top + i as f64 * 12.0))
            .collect()
    }

    #[test]
    fn test_find_single_grid() {
        let edges = grid_edges(&[10.0, 100.0, 200.0], &[10.0, 30.0, 60.0]);
        let tables = find_tables(&edges, &TableSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].num_rows(), 2);
        assert_eq!(tables[0].num_cols(), 2);
        assert_eq!(tables[0].bbox, BBox::new(10.0, 10.0, 200.0, 60.0));
    }

    #[test]
    fn test_snapping_merges_nearly_aligned_rules() {
        let mut edges = grid_edges(&[10.0, 100.0, 200.0], &[10.0, 30.0, 60.0]);
        // A double-drawn border slightly off the first one.
        edges.push(Edge::horizontal(10.0, 200.0, 31.5));
        // Split border segments.
        edges.push(Edge::horizontal(10.0, 90.0, 60.0));
        edges.push(Edge::horizontal(91.0, 200.0, 60.0));
        let tables = find_tables(&edges, &TableSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].num_rows(), 2);
    }

    #[test]
    fn test_separate_tables_are_ordered() {
        let mut edges = grid_edges(&[10.0, 100.0, 200.0], &[300.0, 320.0, 340.0]);
        edges.extend(grid_edges(&[10.0, 50.0, 90.0], &[20.0, 40.0, 60.0]));
        let tables = find_tables(&edges, &TableSettings::default());
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].bbox.top, 20.0);
        assert_eq!(tables[1].bbox.top, 300.0);
    }

    #[test]
    fn test_extract_multiline_cells() {
        let edges = grid_edges(&[10.0, 100.0, 200.0], &[10.0, 30.0, 100.0]);
        let mut glyphs = cell_text(&["Code"], 15.0, 15.0);
        glyphs.extend(cell_text(&["Qty"], 105.0, 15.0));
        glyphs.extend(cell_text(&["A1", "B2", "C3"], 15.0, 35.0));
        glyphs.extend(cell_text(&["1,00", "2,00"], 105.0, 35.0));
        let page = Page::new(1, 595.0, 842.0, glyphs, edges);

        let tables = page.find_tables(&TableSettings::default());
        let grid = tables[0].extract(&page, &LineOptions::default());
        assert_eq!(
            grid,
            vec![
                vec![Some("Code".to_string()), Some("Qty".to_string())],
                vec![Some("A1\nB2\nC3".to_string()), Some("1,00\n2,00".to_string())],
            ]
        );
    }

    #[test]
    fn test_merged_cell_leaves_gap() {
        // Header spans both columns.
        let mut edges = vec![
            Edge::horizontal(10.0, 200.0, 10.0),
            Edge::horizontal(10.0, 200.0, 30.0),
            Edge::horizontal(10.0, 200.0, 50.0),
            Edge::vertical(10.0, 10.0, 50.0),
            Edge::vertical(200.0, 10.0, 50.0),
        ];
        edges.push(Edge::vertical(100.0, 30.0, 50.0));
        let tables = find_tables(&edges, &TableSettings::default());
        assert_eq!(tables.len(), 1);
        let rows = &tables[0].rows;
        assert!(rows[0][0].is_some());
        assert!(rows[0][1].is_none());
        assert!(rows[1].iter().all(Option::is_some));
    }
}
