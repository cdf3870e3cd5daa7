/// Regularisation added to the cross-power magnitude before normalisation.
pub const CROSS_POWER_EPS: f64 = 1e-8;

/// A new grid row starts when the y-gap between sorted tiles exceeds
/// this fraction of the physical tile height.
pub const ROW_GAP_FACTOR: f64 = 0.5;

/// Default worker threads for viewport re-registration jobs.
pub const DEFAULT_VIEWPORT_WORKERS: usize = 4;

/// Downsample factors built for the overview pyramid.
pub const PYRAMID_FACTORS: [u32; 3] = [4, 8, 16];

/// Zoom thresholds for picking a display pyramid level: below the first
/// threshold level 4 is shown, below the second level 8, otherwise 16.
pub const ZOOM_LEVEL_THRESHOLDS: [f64; 2] = [6.0, 12.0];

/// Filename prefix of acquisition tiles: `manual_{fov}_{z}_{suffix}.tiff`.
pub const TILE_FILE_PREFIX: &str = "manual_";

/// Name of the acquisition metadata file at the dataset root.
pub const ACQUISITION_PARAMS_FILE: &str = "acquisition parameters.json";

/// Name of the nominal stage coordinate table inside a z-subdirectory.
pub const COORDINATES_FILE: &str = "coordinates.csv";
