use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use tessera_core::align::{bundle_adjust, phase_correlate};
use tessera_core::grid::TileGrid;
use tessera_core::io::coordinates::{read_coordinates, write_coordinates, CoordinateRow};
use tessera_core::source::{DirectorySource, TileSource};
use tessera_core::tile::{NeighborEdge, StagePosition, Tile, TileId};

#[derive(Args)]
pub struct RegisterArgs {
    /// Dataset root containing 'acquisition parameters.json' and tiles
    #[arg(long)]
    pub dir: PathBuf,

    /// Z-slice to register
    #[arg(long, default_value = "0")]
    pub z: u32,

    /// Output file; defaults to 'coordinates_refined.csv' next to the input
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &RegisterArgs) -> Result<()> {
    let source = DirectorySource::open(&args.dir)?;
    let pixel_size_mm = source.params().pixel_size_mm();

    let coord_path = super::locate_coordinates(&args.dir)?;
    let rows = read_coordinates(&coord_path)?;
    let positions: Vec<StagePosition> = rows.iter().map(|r| r.position).collect();

    println!("Tiles:       {}", rows.len());
    println!("Pixel size:  {:.6} mm", pixel_size_mm);

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Loading tiles");

    let tiles: Vec<Tile> = rows
        .iter()
        .map(|row| {
            let data = source
                .load_tile(row.fov, args.z, 1)
                .with_context(|| format!("loading fov {}", row.fov))?;
            pb.inc(1);
            Ok::<_, anyhow::Error>(Tile::new(
                TileId {
                    fov: row.fov,
                    z: args.z,
                },
                data,
                row.position,
            ))
        })
        .collect::<Result<_>>()?;
    pb.finish_with_message("Tiles loaded");

    let (tile_h, tile_w) = (tiles[0].height(), tiles[0].width());
    let grid = TileGrid::from_positions(&positions, tile_h as f64 * pixel_size_mm);
    let pairs = grid.neighbor_pairs();

    println!(
        "Grid:        {} rows x {} cols, {} neighbor pairs",
        grid.row_count(),
        grid.col_count(),
        pairs.len()
    );
    println!("Tile size:   {}x{} px", tile_w, tile_h);

    let pb = ProgressBar::new(pairs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Correlating pairs");

    let edges: Vec<NeighborEdge> = pairs
        .par_iter()
        .map(|&(a, b, direction)| {
            let corr = phase_correlate(&tiles[a].data, &tiles[b].data)?;
            pb.inc(1);
            tracing::debug!(
                a = rows[a].fov,
                b = rows[b].fov,
                dy = corr.shift.dy,
                dx = corr.shift.dx,
                "pair registered"
            );
            Ok(NeighborEdge {
                a,
                b,
                direction,
                shift: corr.shift,
                confidence: corr.peak,
            })
        })
        .collect::<tessera_core::error::Result<_>>()?;
    pb.finish_with_message("Pairs correlated");

    let global = bundle_adjust(&positions, pixel_size_mm, &edges)?;

    let refined: Vec<CoordinateRow> = rows
        .iter()
        .zip(&global)
        .map(|(row, g)| CoordinateRow {
            fov: row.fov,
            position: StagePosition {
                x_mm: g.x_mm,
                y_mm: g.y_mm,
            },
        })
        .collect();

    let output = args.output.clone().unwrap_or_else(|| {
        coord_path.with_file_name("coordinates_refined.csv")
    });
    write_coordinates(&output, &refined)?;

    let max_shift_mm = positions
        .iter()
        .zip(&global)
        .map(|(p, g)| ((g.x_mm - p.x_mm).powi(2) + (g.y_mm - p.y_mm).powi(2)).sqrt())
        .fold(0.0f64, f64::max);

    println!("\nMax correction: {:.3} um", max_shift_mm * 1000.0);
    println!("Refined coordinates written to {}", output.display());

    Ok(())
}
