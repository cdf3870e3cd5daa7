//! Clusters tiles into rows from nominal stage coordinates and proposes
//! the sparse neighbor graph used for pairwise registration.

use crate::consts::ROW_GAP_FACTOR;
use crate::tile::{Direction, StagePosition};

/// Row/column structure inferred from nominal stage positions.
///
/// Indices refer back into the position slice the grid was built from.
#[derive(Clone, Debug)]
pub struct TileGrid {
    rows: Vec<Vec<usize>>,
    positions: Vec<StagePosition>,
}

impl TileGrid {
    /// Cluster tiles into rows.
    ///
    /// Tiles are walked in y-sorted order; a new row starts whenever the
    /// y-gap from the previous tile exceeds `ROW_GAP_FACTOR * tile_height_mm`.
    /// Each row is then sorted by x.
    pub fn from_positions(positions: &[StagePosition], tile_height_mm: f64) -> Self {
        let tol = ROW_GAP_FACTOR * tile_height_mm;

        let mut order: Vec<usize> = (0..positions.len()).collect();
        order.sort_by(|&a, &b| positions[a].y_mm.total_cmp(&positions[b].y_mm));

        let mut rows: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut prev_y: Option<f64> = None;

        for idx in order {
            let y = positions[idx].y_mm;
            match prev_y {
                Some(p) if (y - p).abs() > tol => {
                    rows.push(std::mem::take(&mut current));
                    current.push(idx);
                }
                _ => current.push(idx),
            }
            prev_y = Some(y);
        }
        if !current.is_empty() {
            rows.push(current);
        }

        for row in &mut rows {
            row.sort_by(|&a, &b| positions[a].x_mm.total_cmp(&positions[b].x_mm));
        }

        Self {
            rows,
            positions: positions.to_vec(),
        }
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row; the nominal column count of the grid.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Propose east and south neighbor pairs.
    ///
    /// Adjacent tiles within a row form east edges. Each tile's south edge
    /// connects to the tile in the next row whose x is closest to its own,
    /// which tolerates missing tiles and ragged rows but can mis-pair
    /// columns when a row is shorter than its neighbor; that approximation
    /// is accepted rather than patched over.
    pub fn neighbor_pairs(&self) -> Vec<(usize, usize, Direction)> {
        let mut pairs = Vec::new();

        for (r, row) in self.rows.iter().enumerate() {
            for (c, &idx) in row.iter().enumerate() {
                if c + 1 < row.len() {
                    pairs.push((idx, row[c + 1], Direction::East));
                }
                if r + 1 < self.rows.len() {
                    let x = self.positions[idx].x_mm;
                    let below = self.rows[r + 1]
                        .iter()
                        .copied()
                        .min_by(|&a, &b| {
                            let da = (self.positions[a].x_mm - x).abs();
                            let db = (self.positions[b].x_mm - x).abs();
                            da.total_cmp(&db)
                        })
                        .expect("rows are never empty");
                    pairs.push((idx, below, Direction::South));
                }
            }
        }

        pairs
    }
}
