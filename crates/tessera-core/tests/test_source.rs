mod common;

use std::path::Path;

use image::{ImageBuffer, Luma};

use tessera_core::error::TesseraError;
use tessera_core::io::coordinates::{read_coordinates, write_coordinates, CoordinateRow};
use tessera_core::source::{DirectorySource, TileSource};
use tessera_core::tile::StagePosition;

fn write_params(root: &Path, pixel_size_um: f64) {
    std::fs::write(
        root.join("acquisition parameters.json"),
        format!(r#"{{"sensor_pixel_size_um": {pixel_size_um}}}"#),
    )
    .unwrap();
}

/// Write a 16-bit grayscale TIFF whose value at (r, c) is r * w + c + base.
fn write_tile(dir: &Path, name: &str, h: u32, w: u32, base: u16) {
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_fn(w, h, |x, y| {
        Luma([(y * w + x) as u16 + base])
    });
    img.save(dir.join(name)).unwrap();
}

#[test]
fn loads_tiles_from_acquisition_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_params(dir.path(), 1.85);

    // Tiles live in a per-z subdirectory, as the microscope writes them.
    let z_dir = dir.path().join("0");
    std::fs::create_dir(&z_dir).unwrap();
    write_tile(&z_dir, "manual_0_0_BF_LED_matrix_full.tiff", 8, 8, 100);
    write_tile(&z_dir, "manual_1_0_BF_LED_matrix_full.tiff", 8, 8, 200);
    write_tile(&z_dir, "manual_2_0_BF_LED_matrix_full.tiff", 8, 8, 300);
    // Foreign files are skipped, not fatal.
    std::fs::write(z_dir.join("notes.txt"), "ignore me").unwrap();

    let source = DirectorySource::open(dir.path()).unwrap();
    assert_eq!(source.fovs_at(0), vec![0, 1, 2]);
    assert!((source.params().pixel_size_mm() - 0.00185).abs() < 1e-12);

    let tile = source.load_tile(1, 0, 1).unwrap();
    assert_eq!(tile.dim(), (8, 8));
    assert_eq!(tile[[0, 0]], 200.0);
    assert_eq!(tile[[2, 3]], 219.0);
}

#[test]
fn distinguishes_missing_tile_from_unsupported_level() {
    let dir = tempfile::tempdir().unwrap();
    write_params(dir.path(), 1.85);
    write_tile(dir.path(), "manual_0_0_chan.tiff", 4, 4, 0);

    let source = DirectorySource::open(dir.path()).unwrap();
    assert!(matches!(
        source.load_tile(9, 0, 1),
        Err(TesseraError::TileNotFound { fov: 9, z: 0 })
    ));
    assert!(matches!(
        source.load_tile(0, 0, 4),
        Err(TesseraError::UnsupportedLevel(4))
    ));
}

#[test]
fn first_channel_by_suffix_order_wins() {
    let dir = tempfile::tempdir().unwrap();
    write_params(dir.path(), 1.85);
    write_tile(dir.path(), "manual_0_0_Fluorescence_488_nm_Ex.tiff", 4, 4, 50);
    write_tile(dir.path(), "manual_0_0_BF_LED_matrix_full.tiff", 4, 4, 10);

    let source = DirectorySource::open(dir.path()).unwrap();
    let tile = source.load_tile(0, 0, 1).unwrap();
    assert_eq!(tile[[0, 0]], 10.0);
}

#[test]
fn overview_tiles_fovs_into_square_ish_mosaic() {
    let dir = tempfile::tempdir().unwrap();
    write_params(dir.path(), 1.85);
    for fov in 0..3 {
        write_tile(
            dir.path(),
            &format!("manual_{fov}_0_chan.tiff"),
            8,
            8,
            fov as u16 * 100,
        );
    }

    let source = DirectorySource::open(dir.path()).unwrap();
    let mosaic = source.load_overview(1).unwrap();
    // 3 fovs: 2 columns, 2 rows; the fourth cell stays zero.
    assert_eq!(mosaic.dim(), (16, 16));
    assert_eq!(mosaic[[0, 0]], 0.0);
    assert_eq!(mosaic[[0, 8]], 100.0);
    assert_eq!(mosaic[[8, 0]], 200.0);
    assert_eq!(mosaic[[8, 8]], 0.0);
}

#[test]
fn dataset_without_tiles_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_params(dir.path(), 1.85);
    assert!(matches!(
        DirectorySource::open(dir.path()),
        Err(TesseraError::Config(_))
    ));
}

#[test]
fn missing_params_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_tile(dir.path(), "manual_0_0_chan.tiff", 4, 4, 0);
    match DirectorySource::open(dir.path()) {
        Err(TesseraError::Config(message)) => {
            assert!(message.contains("acquisition parameters.json"), "{message}");
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn coordinate_csv_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coordinates.csv");

    let rows = vec![
        CoordinateRow {
            fov: 0,
            position: StagePosition { x_mm: 1.25, y_mm: -0.5 },
        },
        CoordinateRow {
            fov: 1,
            position: StagePosition { x_mm: 1.298, y_mm: -0.5 },
        },
    ];
    write_coordinates(&path, &rows).unwrap();

    let read = read_coordinates(&path).unwrap();
    assert_eq!(read, rows);
}

#[test]
fn coordinate_errors_carry_line_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coordinates.csv");
    std::fs::write(&path, "fov,x (mm),y (mm)\n0,1.0,2.0\nbad,row,here\n").unwrap();

    match read_coordinates(&path) {
        Err(TesseraError::CoordinateFile { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected CoordinateFile error, got {other:?}"),
    }
}
