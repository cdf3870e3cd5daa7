//! The tabular stage coordinate file: `fov,x (mm),y (mm)`, one row per
//! tile. The refined output of batch registration uses the same schema.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Result, TesseraError};
use crate::tile::StagePosition;

/// One row of a coordinate table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateRow {
    pub fov: u32,
    pub position: StagePosition,
}

const HEADER: &str = "fov,x (mm),y (mm)";

/// Parse a coordinate CSV. Errors carry the file path and line number.
pub fn read_coordinates(path: &Path) -> Result<Vec<CoordinateRow>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        TesseraError::Config(format!("cannot read '{}': {e}", path.display()))
    })?;

    let mut lines = text.lines().enumerate();
    match lines.next() {
        Some((_, header)) if header.trim() == HEADER => {}
        Some((_, header)) => {
            return Err(TesseraError::CoordinateFile {
                path: path.to_path_buf(),
                line: 1,
                message: format!("expected header '{HEADER}', found '{}'", header.trim()),
            });
        }
        None => {
            return Err(TesseraError::CoordinateFile {
                path: path.to_path_buf(),
                line: 1,
                message: "file is empty".into(),
            });
        }
    }

    let mut rows = Vec::new();
    for (i, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rows.push(parse_row(line).map_err(|message| TesseraError::CoordinateFile {
            path: path.to_path_buf(),
            line: i + 1,
            message,
        })?);
    }

    if rows.is_empty() {
        return Err(TesseraError::CoordinateFile {
            path: path.to_path_buf(),
            line: 1,
            message: "no data rows".into(),
        });
    }
    Ok(rows)
}

fn parse_row(line: &str) -> std::result::Result<CoordinateRow, String> {
    let mut fields = line.split(',');
    let fov = fields
        .next()
        .ok_or("missing 'fov' field")?
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad fov: {e}"))?;
    let x_mm = fields
        .next()
        .ok_or("missing 'x (mm)' field")?
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad x (mm): {e}"))?;
    let y_mm = fields
        .next()
        .ok_or("missing 'y (mm)' field")?
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad y (mm): {e}"))?;
    if fields.next().is_some() {
        return Err("too many fields".into());
    }
    Ok(CoordinateRow {
        fov,
        position: StagePosition { x_mm, y_mm },
    })
}

/// Write a coordinate CSV with the canonical header.
pub fn write_coordinates(path: &Path, rows: &[CoordinateRow]) -> Result<()> {
    let mut out = String::with_capacity(rows.len() * 32 + HEADER.len());
    out.push_str(HEADER);
    out.push('\n');
    for row in rows {
        writeln!(
            out,
            "{},{:.6},{:.6}",
            row.fov, row.position.x_mm, row.position.y_mm
        )
        .expect("writing to a String cannot fail");
    }
    std::fs::write(path, out)?;
    Ok(())
}
