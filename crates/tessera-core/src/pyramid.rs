//! Fixed-factor block-mean downsamples of the overview mosaic.

use std::collections::BTreeMap;

use ndarray::Array2;

use crate::consts::PYRAMID_FACTORS;

/// Builds the small set of downsampled overviews the viewer switches
/// between as the zoom changes.
#[derive(Clone, Debug)]
pub struct PyramidBuilder {
    factors: Vec<u32>,
}

impl Default for PyramidBuilder {
    fn default() -> Self {
        Self {
            factors: PYRAMID_FACTORS.to_vec(),
        }
    }
}

impl PyramidBuilder {
    pub fn new(factors: Vec<u32>) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &[u32] {
        &self.factors
    }

    /// Downsample the base mosaic at every configured factor.
    pub fn build_levels(&self, base: &Array2<f32>) -> BTreeMap<u32, Array2<f32>> {
        self.factors
            .iter()
            .map(|&factor| (factor, downsample_mean(base, factor)))
            .collect()
    }
}

/// Block-mean downsample by an integer factor.
///
/// Remainder rows/columns that do not fill a complete block are trimmed,
/// not padded. A factor of 1 (or 0) returns the input unchanged.
pub fn downsample_mean(data: &Array2<f32>, factor: u32) -> Array2<f32> {
    if factor <= 1 {
        return data.clone();
    }
    let f = factor as usize;
    let (h, w) = data.dim();
    let out_h = h / f;
    let out_w = w / f;

    let norm = 1.0 / (f * f) as f32;
    let mut result = Array2::<f32>::zeros((out_h, out_w));
    for r in 0..out_h {
        for c in 0..out_w {
            let mut sum = 0.0f32;
            for dr in 0..f {
                for dc in 0..f {
                    sum += data[[r * f + dr, c * f + dc]];
                }
            }
            result[[r, c]] = sum * norm;
        }
    }

    result
}
