use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use tessera_core::io::coordinates::{read_coordinates, write_coordinates, CoordinateRow};
use tessera_core::tile::StagePosition;

#[derive(Args)]
pub struct CalibrateArgs {
    /// Nominal stage coordinate CSV
    #[arg(long)]
    pub coordinates: PathBuf,

    /// Global-positions text file produced by an external stitching engine
    #[arg(long)]
    pub positions: PathBuf,

    /// Fixed slope in mm per pixel
    #[arg(long, default_value_t = 0.000752)]
    pub mm_per_px: f64,

    /// Output file; defaults to 'coordinates_calibrated.csv' next to the input
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Reconcile an external engine's pixel-space global positions with the
/// nominal stage coordinates: keep the engine's relative layout, fit only
/// a per-axis intercept at a fixed mm/px slope.
pub fn run(args: &CalibrateArgs) -> Result<()> {
    let rows = read_coordinates(&args.coordinates)?;

    // Recover each tile's (row, col) grid index from its nominal
    // coordinates; the engine names tiles by grid index, not fov.
    let xs = sorted_unique(rows.iter().map(|r| r.position.x_mm));
    let ys = sorted_unique(rows.iter().map(|r| r.position.y_mm));

    let text = std::fs::read_to_string(&args.positions)
        .with_context(|| format!("cannot read '{}'", args.positions.display()))?;
    let mut engine: HashMap<(usize, usize), (f64, f64)> = HashMap::new();
    for line in text.lines() {
        if let Some((r, c, x_px, y_px)) = parse_position_line(line) {
            if engine.insert((r, c), (x_px, y_px)).is_some() {
                bail!("duplicate entry for grid cell r{r} c{c} in '{}'", args.positions.display());
            }
        }
    }

    let mut intercepts_x = Vec::with_capacity(rows.len());
    let mut intercepts_y = Vec::with_capacity(rows.len());
    let mut pixels = Vec::with_capacity(rows.len());
    for row in &rows {
        let c = index_of(&xs, row.position.x_mm);
        let r = index_of(&ys, row.position.y_mm);
        let &(x_px, y_px) = engine.get(&(r, c)).with_context(|| {
            format!("fov {} (grid r{r} c{c}) missing from '{}'", row.fov, args.positions.display())
        })?;
        intercepts_x.push(row.position.x_mm - args.mm_per_px * x_px);
        intercepts_y.push(row.position.y_mm - args.mm_per_px * y_px);
        pixels.push((x_px, y_px));
    }

    let (b_x, std_x) = mean_std(&intercepts_x);
    let (b_y, std_y) = mean_std(&intercepts_y);

    println!("Slope (fixed): {} mm/px", args.mm_per_px);
    println!("Computed intercepts:");
    println!("  b_x = {:.6} mm (std {:.6})", b_x, std_x);
    println!("  b_y = {:.6} mm (std {:.6})", b_y, std_y);

    let calibrated: Vec<CoordinateRow> = rows
        .iter()
        .zip(&pixels)
        .map(|(row, &(x_px, y_px))| CoordinateRow {
            fov: row.fov,
            position: StagePosition {
                x_mm: args.mm_per_px * x_px + b_x,
                y_mm: args.mm_per_px * y_px + b_y,
            },
        })
        .collect();

    let output = args.output.clone().unwrap_or_else(|| {
        args.coordinates.with_file_name("coordinates_calibrated.csv")
    });
    write_coordinates(&output, &calibrated)?;
    println!("\nCalibrated coordinates written to {}", output.display());

    Ok(())
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Exact match is intentional: the values being looked up came out of the
/// same file the table was built from.
fn index_of(sorted: &[f64], value: f64) -> usize {
    sorted
        .iter()
        .position(|&v| v == value)
        .expect("value came from the same table")
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// Parse one line of the engine's global-positions output:
/// `manual_r{r}_c{c}_0_<channel>.tiff; ... position: (x, y); ...`
fn parse_position_line(line: &str) -> Option<(usize, usize, f64, f64)> {
    let rest = line.split("manual_r").nth(1)?;
    let (r, rest) = take_digits(rest)?;
    let rest = rest.strip_prefix("_c")?;
    let (c, _) = take_digits(rest)?;

    let rest = line.split("position:").nth(1)?;
    let rest = rest.trim_start().strip_prefix('(')?;
    let (x_px, rest) = rest.split_once(',')?;
    let (y_px, _) = rest.split_once(')')?;

    Some((
        r,
        c,
        x_px.trim().parse().ok()?,
        y_px.trim().parse().ok()?,
    ))
}

fn take_digits(s: &str) -> Option<(usize, &str)> {
    let end = s.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((s[..end].parse().ok()?, &s[end..]))
}
