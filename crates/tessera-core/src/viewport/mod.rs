//! Viewport-driven re-stitching: geometry of the visible window, the
//! composite renderer, and the background controller that ties them to
//! the cache and registration backend.

pub mod compositor;
pub mod controller;

pub use compositor::composite;
pub use controller::{ControllerEvent, ControllerState, ViewportController};

use crate::consts::{PYRAMID_FACTORS, ZOOM_LEVEL_THRESHOLDS};

/// The visible window into the mosaic: center in pixel space of the
/// displayed layer, plus a zoom factor. Purely transient; recomputed on
/// every view-change event.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    /// (y, x) center in displayed-layer pixels.
    pub center: (f64, f64),
    pub zoom: f64,
}

impl Viewport {
    pub fn new(center: (f64, f64), zoom: f64) -> Self {
        Self { center, zoom }
    }

    /// Pixel-space bounding box of what the viewport shows of a layer
    /// with the given dimensions.
    pub fn bounds(&self, layer_height: usize, layer_width: usize) -> BoundingBox {
        let half_h = (layer_height as f64 / self.zoom) / 2.0;
        let half_w = (layer_width as f64 / self.zoom) / 2.0;
        BoundingBox {
            ymin: self.center.0 - half_h,
            ymax: self.center.0 + half_h,
            xmin: self.center.1 - half_w,
            xmax: self.center.1 + half_w,
        }
    }
}

/// Axis-aligned pixel-space rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub ymin: f64,
    pub ymax: f64,
    pub xmin: f64,
    pub xmax: f64,
}

impl BoundingBox {
    pub fn contains(&self, y: f64, x: f64) -> bool {
        self.ymin <= y && y <= self.ymax && self.xmin <= x && x <= self.xmax
    }
}

/// Pick the display downsample level for a zoom factor from the fixed
/// threshold table: finer zoom gets a finer pyramid level.
pub fn level_for_zoom(zoom: f64) -> u32 {
    if zoom < ZOOM_LEVEL_THRESHOLDS[0] {
        PYRAMID_FACTORS[0]
    } else if zoom < ZOOM_LEVEL_THRESHOLDS[1] {
        PYRAMID_FACTORS[1]
    } else {
        PYRAMID_FACTORS[2]
    }
}

/// Tiles whose precomputed pixel-space center falls inside the box.
pub fn visible_fovs(centers: &[(u32, (f64, f64))], bbox: &BoundingBox) -> Vec<u32> {
    centers
        .iter()
        .filter(|(_, (y, x))| bbox.contains(*y, *x))
        .map(|&(fov, _)| fov)
        .collect()
}
