use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesseraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed coordinate file {path} (line {line}): {message}")]
    CoordinateFile {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("No tile found for fov={fov}, z={z}")]
    TileNotFound { fov: u32, z: u32 },

    #[error("Unsupported pyramid level {0}: only level 1 is available from this source")]
    UnsupportedLevel(u32),

    #[error("Tile of {size} bytes exceeds cache budget of {max_bytes} bytes")]
    TileTooLarge { size: usize, max_bytes: usize },

    #[error("Neighbor graph is disconnected: {unreachable} of {total} tiles unreachable from the anchor")]
    DisconnectedGrid { unreachable: usize, total: usize },

    #[error("Empty tile set")]
    EmptyTileSet,

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TesseraError>;
