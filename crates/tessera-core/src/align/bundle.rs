//! Global least-squares reconciliation of pairwise shift measurements.
//!
//! Each tile gets one unknown correction per axis. Every measured edge
//! constrains the difference of two corrections; an anchor row pins the
//! first tile so the otherwise rank-deficient system has a unique
//! solution. The x and y systems are independent and solved separately.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, TesseraError};
use crate::tile::{GlobalPosition, NeighborEdge, StagePosition};

/// Solve for globally consistent tile positions.
///
/// `pixel_size_mm` converts the measured pixel shifts into stage units.
/// Tiles unreachable from the anchor (index 0) would be unconstrained, so
/// a disconnected neighbor graph fails fast instead of letting the solver
/// hand back silent zeros.
pub fn bundle_adjust(
    nominal: &[StagePosition],
    pixel_size_mm: f64,
    edges: &[NeighborEdge],
) -> Result<Vec<GlobalPosition>> {
    let n = nominal.len();
    if n == 0 {
        return Err(TesseraError::EmptyTileSet);
    }

    let unreachable = count_unreachable(n, edges);
    if unreachable > 0 {
        return Err(TesseraError::DisconnectedGrid {
            unreachable,
            total: n,
        });
    }

    // One residual row per edge, plus the anchor row.
    let m = edges.len() + 1;
    let mut a = DMatrix::<f64>::zeros(m, n);
    let mut bx = DVector::<f64>::zeros(m);
    let mut by = DVector::<f64>::zeros(m);

    for (k, edge) in edges.iter().enumerate() {
        a[(k, edge.a)] = -1.0;
        a[(k, edge.b)] = 1.0;

        let measured_dx_mm = edge.shift.dx * pixel_size_mm;
        let measured_dy_mm = edge.shift.dy * pixel_size_mm;
        let nominal_dx_mm = nominal[edge.b].x_mm - nominal[edge.a].x_mm;
        let nominal_dy_mm = nominal[edge.b].y_mm - nominal[edge.a].y_mm;

        bx[k] = measured_dx_mm - nominal_dx_mm;
        by[k] = measured_dy_mm - nominal_dy_mm;
    }
    a[(m - 1, 0)] = 1.0;

    let svd = a.svd(true, true);
    let cx = svd
        .solve(&bx, 1e-12)
        .map_err(|e| TesseraError::Solver(e.to_string()))?;
    let cy = svd
        .solve(&by, 1e-12)
        .map_err(|e| TesseraError::Solver(e.to_string()))?;

    Ok(nominal
        .iter()
        .enumerate()
        .map(|(i, p)| GlobalPosition {
            x_mm: p.x_mm + cx[i],
            y_mm: p.y_mm + cy[i],
        })
        .collect())
}

/// Tiles not reachable from the anchor through the (undirected) edge set.
fn count_unreachable(n: usize, edges: &[NeighborEdge]) -> usize {
    let mut adjacency = vec![Vec::new(); n];
    for edge in edges {
        adjacency[edge.a].push(edge.b);
        adjacency[edge.b].push(edge.a);
    }

    let mut visited = vec![false; n];
    let mut stack = vec![0usize];
    visited[0] = true;
    while let Some(i) = stack.pop() {
        for &j in &adjacency[i] {
            if !visited[j] {
                visited[j] = true;
                stack.push(j);
            }
        }
    }

    visited.iter().filter(|&&v| !v).count()
}
