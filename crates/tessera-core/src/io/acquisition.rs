//! Acquisition metadata written by the microscope control software.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::ACQUISITION_PARAMS_FILE;
use crate::error::{Result, TesseraError};

/// Structured view of `acquisition parameters.json`. Only the fields the
/// registration pipeline consumes are modelled; unknown keys are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionParams {
    pub sensor_pixel_size_um: f64,
}

impl AcquisitionParams {
    /// Read the metadata file from the dataset root. Missing file or
    /// missing key is a fatal configuration error naming the culprit.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(ACQUISITION_PARAMS_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            TesseraError::Config(format!("cannot read '{}': {e}", path.display()))
        })?;
        let params: Self = serde_json::from_str(&text).map_err(|e| {
            TesseraError::Config(format!(
                "malformed '{}' (expected key 'sensor_pixel_size_um'): {e}",
                path.display()
            ))
        })?;
        Ok(params)
    }

    /// Physical pixel pitch in millimetres.
    pub fn pixel_size_mm(&self) -> f64 {
        self.sensor_pixel_size_um / 1000.0
    }
}
