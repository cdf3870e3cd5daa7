//! Tile-loading collaborators.
//!
//! `DirectorySource` serves the acquisition layout the microscope writes:
//! a dataset root holding `acquisition parameters.json` and per-z
//! subdirectories of `manual_{fov}_{z}_{suffix}.tiff` tiles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{debug, warn};

use crate::consts::TILE_FILE_PREFIX;
use crate::error::{Result, TesseraError};
use crate::io::acquisition::AcquisitionParams;

/// Loads decoded tiles and overview mosaics on behalf of the cache and
/// the viewport controller. Implementations must distinguish a missing
/// tile (`TileNotFound`) from a level the source cannot serve
/// (`UnsupportedLevel`).
pub trait TileSource: Send + Sync {
    fn load_tile(&self, fov: u32, z: u32, level: u32) -> Result<Array2<f32>>;
    fn load_overview(&self, level: u32) -> Result<Array2<f32>>;
}

/// Channel file for one (fov, z) tile, keyed by filename suffix.
type ChannelFiles = Vec<(String, PathBuf)>;

/// On-disk tile source over an acquisition directory.
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
    params: AcquisitionParams,
    index: BTreeMap<(u32, u32), ChannelFiles>,
}

impl DirectorySource {
    /// Scan `root` recursively for tile TIFFs and read the acquisition
    /// metadata. Unparseable filenames are skipped; finding no parseable
    /// tile at all is fatal.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(TesseraError::Config(format!(
                "dataset root '{}' is not a directory",
                root.display()
            )));
        }

        let params = AcquisitionParams::load(&root)?;

        let mut index: BTreeMap<(u32, u32), ChannelFiles> = BTreeMap::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                match parse_tile_filename(name) {
                    Some((fov, z, suffix)) => {
                        index.entry((fov, z)).or_default().push((suffix, path));
                    }
                    None => {
                        if name.to_ascii_lowercase().ends_with(".tiff") {
                            warn!(file = name, "skipping tile with unparseable filename");
                        }
                    }
                }
            }
        }

        if index.is_empty() {
            return Err(TesseraError::Config(format!(
                "no tile TIFFs found under '{}'",
                root.display()
            )));
        }

        // Deterministic channel order within each tile.
        for channels in index.values_mut() {
            channels.sort_by(|a, b| a.0.cmp(&b.0));
        }

        debug!(tiles = index.len(), root = %root.display(), "indexed dataset");
        Ok(Self {
            root,
            params,
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn params(&self) -> &AcquisitionParams {
        &self.params
    }

    /// Field-of-view ids present at the given z-slice, sorted.
    pub fn fovs_at(&self, z: u32) -> Vec<u32> {
        self.index
            .keys()
            .filter(|&&(_, tz)| tz == z)
            .map(|&(fov, _)| fov)
            .collect()
    }

    fn read_channel(&self, path: &Path) -> Result<Array2<f32>> {
        let img = image::open(path)?;
        let gray = img.into_luma16();
        let (w, h) = gray.dimensions();
        let mut data = Array2::<f32>::zeros((h as usize, w as usize));
        for (x, y, pixel) in gray.enumerate_pixels() {
            data[[y as usize, x as usize]] = pixel.0[0] as f32;
        }
        Ok(data)
    }
}

impl TileSource for DirectorySource {
    /// Load the first channel (by suffix order) of the requested tile.
    /// Only full resolution (level 1) exists on disk.
    fn load_tile(&self, fov: u32, z: u32, level: u32) -> Result<Array2<f32>> {
        if level != 1 {
            return Err(TesseraError::UnsupportedLevel(level));
        }
        let channels = self
            .index
            .get(&(fov, z))
            .ok_or(TesseraError::TileNotFound { fov, z })?;
        let (_, path) = &channels[0];
        self.read_channel(path)
    }

    /// Assemble a square-ish mosaic of every fov at the first z-slice,
    /// in fov order. Registration has not run at this point; the layout
    /// is only meant to give the viewer something to navigate.
    fn load_overview(&self, level: u32) -> Result<Array2<f32>> {
        if level != 1 {
            return Err(TesseraError::UnsupportedLevel(level));
        }

        let &(_, z) = self
            .index
            .keys()
            .next()
            .ok_or(TesseraError::EmptyTileSet)?;
        let fovs = self.fovs_at(z);

        let first = self.load_tile(fovs[0], z, level)?;
        let (tile_h, tile_w) = first.dim();

        let cols = (fovs.len() as f64).sqrt().ceil() as usize;
        let rows = fovs.len().div_ceil(cols);

        let mut mosaic = Array2::<f32>::zeros((rows * tile_h, cols * tile_w));
        for (i, &fov) in fovs.iter().enumerate() {
            let tile = if i == 0 {
                first.clone()
            } else {
                self.load_tile(fov, z, level)?
            };
            let r = i / cols;
            let c = i % cols;
            let mut window = mosaic.slice_mut(ndarray::s![
                r * tile_h..(r + 1) * tile_h,
                c * tile_w..(c + 1) * tile_w
            ]);
            window.assign(&tile);
        }

        Ok(mosaic)
    }
}

/// Parse `manual_{fov}_{z}_{suffix}.tiff` into its parts.
pub fn parse_tile_filename(name: &str) -> Option<(u32, u32, String)> {
    let lower = name.to_ascii_lowercase();
    let stem = lower.strip_suffix(".tiff")?;
    let stem = &name[..stem.len()];
    let rest = stem.strip_prefix(TILE_FILE_PREFIX)?;

    let mut parts = rest.splitn(3, '_');
    let fov = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    let suffix = parts.next()?;
    if suffix.is_empty() {
        return None;
    }
    Some((fov, z, suffix.to_string()))
}
