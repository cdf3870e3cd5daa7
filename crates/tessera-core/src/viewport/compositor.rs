//! Pastes registered tiles into a displayable canvas.

use ndarray::Array2;

use crate::error::{Result, TesseraError};
use crate::tile::PixelShift;

/// Composite registered tiles at a downsample level.
///
/// The canvas spans the bounding extent of the tile offsets at `level`
/// plus one tile's downsampled footprint. Tiles are reduced by plain
/// stride subsampling (display speed, not quality) and pasted in
/// iteration order; overlaps are overwritten, never blended.
pub fn composite(
    tiles: &[Array2<f32>],
    offsets: &[PixelShift],
    level: u32,
) -> Result<Array2<f32>> {
    if tiles.is_empty() {
        return Err(TesseraError::EmptyTileSet);
    }
    if tiles.len() != offsets.len() {
        return Err(TesseraError::Registration(format!(
            "{} tiles but {} offsets",
            tiles.len(),
            offsets.len()
        )));
    }
    let stride = level.max(1) as usize;

    let min_dy = offsets.iter().map(|o| o.dy).fold(f64::INFINITY, f64::min);
    let min_dx = offsets.iter().map(|o| o.dx).fold(f64::INFINITY, f64::min);

    let placed: Vec<(usize, usize)> = offsets
        .iter()
        .map(|o| {
            let y = ((o.dy - min_dy) / stride as f64).round() as usize;
            let x = ((o.dx - min_dx) / stride as f64).round() as usize;
            (y, x)
        })
        .collect();

    let (tile_h, tile_w) = tiles[0].dim();
    let ds_h = tile_h.div_ceil(stride);
    let ds_w = tile_w.div_ceil(stride);

    let canvas_h = placed.iter().map(|&(y, _)| y).max().unwrap_or(0) + ds_h;
    let canvas_w = placed.iter().map(|&(_, x)| x).max().unwrap_or(0) + ds_w;
    let mut canvas = Array2::<f32>::zeros((canvas_h, canvas_w));

    for (tile, &(oy, ox)) in tiles.iter().zip(&placed) {
        let (h, w) = tile.dim();
        for r in (0..h).step_by(stride) {
            let cy = oy + r / stride;
            if cy >= canvas_h {
                break;
            }
            for c in (0..w).step_by(stride) {
                let cx = ox + c / stride;
                if cx >= canvas_w {
                    break;
                }
                canvas[[cy, cx]] = tile[[r, c]];
            }
        }
    }

    Ok(canvas)
}
