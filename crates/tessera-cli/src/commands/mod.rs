pub mod calibrate;
pub mod info;
pub mod register;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tessera_core::consts::COORDINATES_FILE;

/// Find `coordinates.csv` at the dataset root or in one of its immediate
/// subdirectories (the microscope writes it next to the tiles of each
/// z-stack, usually `0/`).
pub fn locate_coordinates(root: &Path) -> Result<PathBuf> {
    let direct = root.join(COORDINATES_FILE);
    if direct.is_file() {
        return Ok(direct);
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();

    for dir in subdirs {
        let candidate = dir.join(COORDINATES_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    bail!("no '{}' found under '{}'", COORDINATES_FILE, root.display());
}
