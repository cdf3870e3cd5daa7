//! Registration backend seam.
//!
//! The viewport controller registers whatever tile subset is visible
//! through this trait, so a full external stitching engine can be swapped
//! in for the built-in correlator without touching the controller. The
//! backend is an owned value with an ordinary construct/drop lifecycle;
//! nothing lives in global state.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{Result, TesseraError};
use crate::tile::{Direction, NeighborEdge, PixelShift, StagePosition};

use super::bundle::bundle_adjust;
use super::phase_correlation::phase_correlate;

/// Computes one pixel translation per tile of a row-major `rows x cols`
/// grid. Implementations must be callable from worker threads.
pub trait RegistrationBackend: Send + Sync {
    fn align_tiles(
        &self,
        tiles: &[Array2<f32>],
        rows: usize,
        cols: usize,
    ) -> Result<Vec<PixelShift>>;
}

/// Default backend: phase correlation over grid neighbors reconciled by
/// bundle adjustment, all in pixel units with the first tile at the
/// origin.
#[derive(Debug, Default)]
pub struct CorrelationBackend;

impl CorrelationBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RegistrationBackend for CorrelationBackend {
    fn align_tiles(
        &self,
        tiles: &[Array2<f32>],
        rows: usize,
        cols: usize,
    ) -> Result<Vec<PixelShift>> {
        let n = tiles.len();
        if n == 0 {
            return Err(TesseraError::EmptyTileSet);
        }
        if n > rows * cols {
            return Err(TesseraError::Registration(format!(
                "{n} tiles do not fit a {rows}x{cols} grid"
            )));
        }

        let pairs = grid_pairs(n, cols);

        // Pairs share nothing but the read-only tile buffers.
        let edges: Vec<NeighborEdge> = pairs
            .par_iter()
            .map(|&(a, b, direction)| {
                let corr = phase_correlate(&tiles[a], &tiles[b])?;
                Ok(NeighborEdge {
                    a,
                    b,
                    direction,
                    shift: corr.shift,
                    confidence: corr.peak,
                })
            })
            .collect::<Result<_>>()?;

        // Zero nominals and unit pixel size turn the corrections into
        // absolute pixel positions anchored at tile 0.
        let nominal = vec![StagePosition::default(); n];
        let positions = bundle_adjust(&nominal, 1.0, &edges)?;

        Ok(positions
            .into_iter()
            .map(|p| PixelShift {
                dy: p.y_mm,
                dx: p.x_mm,
            })
            .collect())
    }
}

/// East/south neighbor pairs of a dense row-major grid truncated to `n`
/// tiles.
fn grid_pairs(n: usize, cols: usize) -> Vec<(usize, usize, Direction)> {
    let mut pairs = Vec::new();
    for idx in 0..n {
        let col = idx % cols;
        if col + 1 < cols && idx + 1 < n {
            pairs.push((idx, idx + 1, Direction::East));
        }
        if idx + cols < n {
            pairs.push((idx, idx + cols, Direction::South));
        }
    }
    pairs
}
