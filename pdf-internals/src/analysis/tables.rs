//! Ruled table detection.
//!
//! Horizontal and vertical ruling lines that cross each other are grouped into
//! grids. A grid with `r + 1` distinct row lines and `c + 1` distinct column
//! lines is an `r x c` table.

use serde::Serialize;

use crate::backend::{LineSegment, Rectangle};

/// Coordinates closer than this many points are the same line.
const SNAP_TOLERANCE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableGrid {
    pub rows: usize,
    pub cols: usize,
    /// Column line positions, left to right
    #[serde(skip)]
    pub column_edges: Vec<f64>,
    /// Row line positions, top to bottom
    #[serde(skip)]
    pub row_edges: Vec<f64>,
}

impl TableGrid {
    /// Page-space bounds of a cell; row 0 is the top row.
    pub fn cell(&self, row: usize, col: usize) -> Option<Rectangle> {
        Some(Rectangle {
            x1: *self.column_edges.get(col)?,
            y1: *self.row_edges.get(row + 1)?,
            x2: *self.column_edges.get(col + 1)?,
            y2: *self.row_edges.get(row)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Horizontal { y: f64, x_min: f64, x_max: f64 },
    Vertical { x: f64, y_min: f64, y_max: f64 },
}

impl Rule {
    fn from_segment(segment: &LineSegment) -> Option<Self> {
        let dx = (segment.x2 - segment.x1).abs();
        let dy = (segment.y2 - segment.y1).abs();
        if dy <= SNAP_TOLERANCE && dx > SNAP_TOLERANCE {
            Some(Self::Horizontal {
                y: (segment.y1 + segment.y2) / 2.0,
                x_min: segment.x1.min(segment.x2),
                x_max: segment.x1.max(segment.x2),
            })
        } else if dx <= SNAP_TOLERANCE && dy > SNAP_TOLERANCE {
            Some(Self::Vertical {
                x: (segment.x1 + segment.x2) / 2.0,
                y_min: segment.y1.min(segment.y2),
                y_max: segment.y1.max(segment.y2),
            })
        } else {
            None
        }
    }
}

fn crosses(a: &Rule, b: &Rule) -> bool {
    match (a, b) {
        (Rule::Horizontal { y, x_min, x_max }, Rule::Vertical { x, y_min, y_max })
        | (Rule::Vertical { x, y_min, y_max }, Rule::Horizontal { y, x_min, x_max }) => {
            *x >= x_min - SNAP_TOLERANCE
                && *x <= x_max + SNAP_TOLERANCE
                && *y >= y_min - SNAP_TOLERANCE
                && *y <= y_max + SNAP_TOLERANCE
        }
        _ => false,
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Ascending distinct positions after snapping nearby values together. Each
/// cluster is represented by its lowest value.
fn distinct_positions(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut positions: Vec<f64> = Vec::new();
    for value in values {
        if positions.last().is_none_or(|prev| value - prev > SNAP_TOLERANCE) {
            positions.push(value);
        }
    }
    positions
}

/// Find ruled tables among a page's line segments, in drawing order of each
/// table's first rule. Single cells are not tables.
pub fn detect_tables(segments: &[LineSegment]) -> Vec<TableGrid> {
    let rules: Vec<Rule> = segments.iter().filter_map(Rule::from_segment).collect();

    let mut parent: Vec<usize> = (0..rules.len()).collect();
    for i in 0..rules.len() {
        for j in (i + 1)..rules.len() {
            if crosses(&rules[i], &rules[j]) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..rules.len() {
        let root = find(&mut parent, i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => groups.push((root, vec![i])),
        }
    }

    groups
        .into_iter()
        .filter_map(|(_, members)| {
            let mut ys = Vec::new();
            let mut xs = Vec::new();
            for &i in &members {
                match rules[i] {
                    Rule::Horizontal { y, .. } => ys.push(y),
                    Rule::Vertical { x, .. } => xs.push(x),
                }
            }
            let mut row_edges = distinct_positions(ys);
            row_edges.reverse();
            let column_edges = distinct_positions(xs);
            let rows = row_edges.len().checked_sub(1)?;
            let cols = column_edges.len().checked_sub(1)?;
            (rows >= 1 && cols >= 1 && rows * cols >= 2).then_some(TableGrid {
                rows,
                cols,
                column_edges,
                row_edges,
            })
        })
        .collect()
}
