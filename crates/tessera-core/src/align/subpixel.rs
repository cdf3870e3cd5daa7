use ndarray::Array2;

/// Refine the correlation peak with independent 1-D parabola fits.
///
/// Returns (delta_row, delta_col) as fractional offsets from the integer
/// peak. An axis whose peak touches the array boundary has no interior
/// neighbor on one side; refinement for that axis degrades to zero.
pub fn refine_peak(correlation: &Array2<f64>, peak_row: usize, peak_col: usize) -> (f64, f64) {
    let (h, w) = correlation.dim();

    let delta_row = if peak_row == 0 || peak_row >= h - 1 {
        0.0
    } else {
        parabola_vertex(
            correlation[[peak_row - 1, peak_col]],
            correlation[[peak_row, peak_col]],
            correlation[[peak_row + 1, peak_col]],
        )
    };

    let delta_col = if peak_col == 0 || peak_col >= w - 1 {
        0.0
    } else {
        parabola_vertex(
            correlation[[peak_row, peak_col - 1]],
            correlation[[peak_row, peak_col]],
            correlation[[peak_row, peak_col + 1]],
        )
    };

    (delta_row, delta_col)
}

/// Vertex of the parabola through three equally spaced samples, relative
/// to the center sample.
fn parabola_vertex(prev: f64, curr: f64, next: f64) -> f64 {
    let denom = 2.0 * (prev - 2.0 * curr + next);
    if denom.abs() > 1e-12 {
        (prev - next) / denom
    } else {
        0.0
    }
}
