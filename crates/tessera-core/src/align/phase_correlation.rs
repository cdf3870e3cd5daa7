//! Pairwise tile registration via frequency-domain cross-correlation.
//!
//! Tiles are zero-padded to the linear-correlation size so partial
//! overlaps do not alias through the FFT wrap-around, and the peak is
//! refined to sub-pixel precision with per-axis parabola fits.

use ndarray::Array2;
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::consts::CROSS_POWER_EPS;
use crate::error::{Result, TesseraError};
use crate::tile::PixelShift;

use super::subpixel::refine_peak;

/// Result of correlating a candidate tile B against a reference tile A.
#[derive(Clone, Copy, Debug)]
pub struct Correlation {
    /// Sub-pixel shift of B relative to A; positive means B lies
    /// below/right of A.
    pub shift: PixelShift,
    /// Magnitude of the correlation peak.
    pub peak: f64,
}

/// Estimate the translation aligning candidate `b` onto reference `a`.
///
/// Both images are zero-padded to `(Ha+Hb-1, Wa+Wb-1)` and correlated
/// through the normalized cross-power spectrum. Safe to call in parallel
/// across pairs: the only shared state is the read-only inputs.
pub fn phase_correlate(a: &Array2<f32>, b: &Array2<f32>) -> Result<Correlation> {
    let (ha, wa) = a.dim();
    let (hb, wb) = b.dim();
    if ha == 0 || wa == 0 || hb == 0 || wb == 0 {
        return Err(TesseraError::Registration(
            "cannot correlate an empty image".into(),
        ));
    }

    // Linear correlation size: every possible lag gets its own bin.
    let h = ha + hb - 1;
    let w = wa + wb - 1;

    let fa = fft2d(&pad_to(a, h, w));
    let fb = fft2d(&pad_to(b, h, w));

    let cross = normalized_cross_power(&fa, &fb);
    drop(fa);
    drop(fb);

    let magnitude = ifft2d_magnitude(&cross);
    drop(cross);

    // Reorder the circular surface into full-correlation layout, where
    // index m corresponds to lag m - (Hb-1). Negative lags otherwise sit
    // wrapped at the top of the array.
    let full = unwrap_lags(&magnitude, hb - 1, wb - 1);
    drop(magnitude);

    let (peak_row, peak_col, peak_val) = find_peak(&full);
    let (frac_row, frac_col) = refine_peak(&full, peak_row, peak_col);

    let dy = peak_row as f64 + frac_row - (hb - 1) as f64;
    let dx = peak_col as f64 + frac_col - (wb - 1) as f64;

    Ok(Correlation {
        shift: PixelShift { dy, dx },
        peak: peak_val,
    })
}

/// Zero-pad into the top-left corner of an (h, w) complex array,
/// casting pixels to f64 on the way in.
fn pad_to(data: &Array2<f32>, h: usize, w: usize) -> Array2<Complex<f64>> {
    let (dh, dw) = data.dim();
    let mut padded = Array2::<Complex<f64>>::zeros((h, w));
    for row in 0..dh {
        for col in 0..dw {
            padded[[row, col]] = Complex::new(data[[row, col]] as f64, 0.0);
        }
    }
    padded
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.clone();

    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| result[[row, c]]).collect();
        fft_row.process(&mut row_data);
        for col in 0..w {
            result[[row, col]] = row_data[col];
        }
    }

    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| result[[r, col]]).collect();
        fft_col.process(&mut col_data);
        for row in 0..h {
            result[[row, col]] = col_data[row];
        }
    }

    result
}

/// Inverse 2D FFT, returning the magnitude of each sample.
fn ifft2d_magnitude(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();

    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| work[[r, col]]).collect();
        ifft_col.process(&mut col_data);
        for row in 0..h {
            work[[row, col]] = col_data[row];
        }
    }

    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| work[[row, c]]).collect();
        ifft_row.process(&mut row_data);
        for col in 0..w {
            work[[row, col]] = row_data[col];
        }
    }

    let scale = 1.0 / (h * w) as f64;
    let mut result = Array2::<f64>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            result[[row, col]] = work[[row, col]].norm() * scale;
        }
    }

    result
}

/// `R = F_A * conj(F_B) / (|F_A * conj(F_B)| + eps)`.
fn normalized_cross_power(
    fa: &Array2<Complex<f64>>,
    fb: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let (h, w) = fa.dim();
    let mut result = Array2::<Complex<f64>>::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            let cross = fa[[row, col]] * fb[[row, col]].conj();
            result[[row, col]] = cross / (cross.norm() + CROSS_POWER_EPS);
        }
    }

    result
}

/// Roll the circular correlation surface so index m maps to lag
/// `m - (shift_row, shift_col)`, with negative lags at the top/left.
fn unwrap_lags(circular: &Array2<f64>, shift_row: usize, shift_col: usize) -> Array2<f64> {
    let (h, w) = circular.dim();
    let mut full = Array2::<f64>::zeros((h, w));
    for row in 0..h {
        let src_row = (row + h - shift_row) % h;
        for col in 0..w {
            let src_col = (col + w - shift_col) % w;
            full[[row, col]] = circular[[src_row, src_col]];
        }
    }
    full
}

fn find_peak(data: &Array2<f64>) -> (usize, usize, f64) {
    let (h, w) = data.dim();
    let mut best_row = 0;
    let mut best_col = 0;
    let mut best_val = f64::NEG_INFINITY;

    for row in 0..h {
        for col in 0..w {
            if data[[row, col]] > best_val {
                best_val = data[[row, col]];
                best_row = row;
                best_col = col;
            }
        }
    }

    (best_row, best_col, best_val)
}
