use ndarray::Array2;

/// Identity of an acquired tile: one camera frame at one stage position
/// and focal plane. Channels are resolved by the tile source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileId {
    pub fov: u32,
    pub z: u32,
}

/// A single grayscale microscope tile. Pixel values are f32; immutable
/// once loaded.
#[derive(Clone, Debug)]
pub struct Tile {
    pub id: TileId,
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Nominal stage position reported by the acquisition system.
    pub stage: StagePosition,
}

impl Tile {
    pub fn new(id: TileId, data: Array2<f32>, stage: StagePosition) -> Self {
        Self { id, data, stage }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// Nominal stage position in millimetres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StagePosition {
    pub x_mm: f64,
    pub y_mm: f64,
}

/// Globally consistent tile position after bundle adjustment.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlobalPosition {
    pub x_mm: f64,
    pub y_mm: f64,
}

/// Sub-pixel translation of tile B relative to tile A, in pixels.
/// Positive values mean B lies below/right of A.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelShift {
    pub dy: f64,
    pub dx: f64,
}

/// Direction tag of a neighbor edge in the sparse grid graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    East,
    South,
}

/// A measured pairwise constraint between two tiles, indexed into the
/// tile list handed to the bundle adjuster. Created by the correlator,
/// never mutated.
#[derive(Clone, Copy, Debug)]
pub struct NeighborEdge {
    pub a: usize,
    pub b: usize,
    pub direction: Direction,
    pub shift: PixelShift,
    /// Correlation peak magnitude; higher means a more trustworthy shift.
    pub confidence: f64,
}

/// Cache key for a decoded tile at a given pyramid level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub fov: u32,
    pub z: u32,
    pub level: u32,
}

impl TileKey {
    pub fn new(fov: u32, z: u32, level: u32) -> Self {
        Self { fov, z, level }
    }
}
