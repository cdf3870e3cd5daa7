use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::Style;

use tessera_core::grid::TileGrid;
use tessera_core::io::coordinates::read_coordinates;
use tessera_core::source::{DirectorySource, TileSource};
use tessera_core::tile::StagePosition;

#[derive(Args)]
pub struct InfoArgs {
    /// Dataset root containing 'acquisition parameters.json' and tiles
    #[arg(long)]
    pub dir: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let source = DirectorySource::open(&args.dir)?;
    let pixel_size_mm = source.params().pixel_size_mm();

    let label = Style::new().dim();
    let value = Style::new().bold().white();
    let path = Style::new().underlined();

    println!(
        "{:<14}{}",
        label.apply_to("Dataset"),
        path.apply_to(source.root().display())
    );
    println!(
        "{:<14}{}",
        label.apply_to("Pixel size"),
        value.apply_to(format!(
            "{:.6} mm ({:.3} um)",
            pixel_size_mm,
            pixel_size_mm * 1000.0
        ))
    );

    let fovs = source.fovs_at(0);
    println!(
        "{:<14}{}",
        label.apply_to("Tiles (z=0)"),
        value.apply_to(fovs.len())
    );

    if let Some(&fov) = fovs.first() {
        let tile = source.load_tile(fov, 0, 1)?;
        let (h, w) = tile.dim();
        println!(
            "{:<14}{}",
            label.apply_to("Tile size"),
            value.apply_to(format!(
                "{}x{} px ({:.3}x{:.3} mm)",
                w,
                h,
                w as f64 * pixel_size_mm,
                h as f64 * pixel_size_mm
            ))
        );

        if let Ok(coord_path) = super::locate_coordinates(&args.dir) {
            let rows = read_coordinates(&coord_path)?;
            let positions: Vec<StagePosition> = rows.iter().map(|r| r.position).collect();
            let grid = TileGrid::from_positions(&positions, h as f64 * pixel_size_mm);
            println!(
                "{:<14}{}",
                label.apply_to("Grid"),
                value.apply_to(format!("{} rows x {} cols", grid.row_count(), grid.col_count()))
            );
            println!(
                "{:<14}{}",
                label.apply_to("Coordinates"),
                path.apply_to(coord_path.display())
            );
        } else {
            println!("{:<14}not found", label.apply_to("Coordinates"));
        }
    }

    Ok(())
}
