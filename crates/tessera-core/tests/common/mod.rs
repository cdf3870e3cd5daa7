#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ndarray::{s, Array2};

use tessera_core::error::{Result, TesseraError};
use tessera_core::source::TileSource;

/// Deterministic white-noise texture; distinct seeds give uncorrelated
/// content, which makes correlation peaks sharp and tests reproducible.
pub fn textured(h: usize, w: usize, seed: u64) -> Array2<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    Array2::from_shape_fn((h, w), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) & 0xffff) as f32 / 65535.0
    })
}

/// Crop a window out of a larger scene.
pub fn crop(scene: &Array2<f32>, top: usize, left: usize, h: usize, w: usize) -> Array2<f32> {
    scene.slice(s![top..top + h, left..left + w]).to_owned()
}

/// In-memory tile source that counts loads; optionally sleeps to widen
/// race windows in concurrency tests.
pub struct StubSource {
    pub tile: Array2<f32>,
    pub loads: Arc<AtomicUsize>,
    pub delay: Option<Duration>,
}

impl StubSource {
    pub fn new(tile: Array2<f32>) -> Self {
        Self {
            tile,
            loads: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    pub fn with_delay(tile: Array2<f32>, delay: Duration) -> Self {
        Self {
            tile,
            loads: Arc::new(AtomicUsize::new(0)),
            delay: Some(delay),
        }
    }
}

impl TileSource for StubSource {
    fn load_tile(&self, _fov: u32, _z: u32, level: u32) -> Result<Array2<f32>> {
        if level != 1 {
            return Err(TesseraError::UnsupportedLevel(level));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(self.tile.clone())
    }

    fn load_overview(&self, level: u32) -> Result<Array2<f32>> {
        if level != 1 {
            return Err(TesseraError::UnsupportedLevel(level));
        }
        Ok(self.tile.clone())
    }
}
