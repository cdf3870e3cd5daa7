mod common;

use tessera_core::align::bundle_adjust;
use tessera_core::error::TesseraError;
use tessera_core::tile::{Direction, NeighborEdge, PixelShift, StagePosition};

const PX_MM: f64 = 0.001;

fn pos(x: f64, y: f64) -> StagePosition {
    StagePosition { x_mm: x, y_mm: y }
}

fn edge(a: usize, b: usize, direction: Direction, dy: f64, dx: f64) -> NeighborEdge {
    NeighborEdge {
        a,
        b,
        direction,
        shift: PixelShift { dy, dx },
        confidence: 1.0,
    }
}

/// 2x2 grid, 1 mm pitch: indices 0 1 / 2 3.
fn square_nominal() -> Vec<StagePosition> {
    vec![
        pos(0.0, 0.0),
        pos(1.0, 0.0),
        pos(0.0, 1.0),
        pos(1.0, 1.0),
    ]
}

/// Shifts exactly matching the nominal 1 mm spacing at 0.001 mm/px.
fn consistent_edges() -> Vec<NeighborEdge> {
    vec![
        edge(0, 1, Direction::East, 0.0, 1000.0),
        edge(2, 3, Direction::East, 0.0, 1000.0),
        edge(0, 2, Direction::South, 1000.0, 0.0),
        edge(1, 3, Direction::South, 1000.0, 0.0),
    ]
}

#[test]
fn consistent_measurements_give_zero_correction() {
    let nominal = square_nominal();
    let global = bundle_adjust(&nominal, PX_MM, &consistent_edges()).unwrap();

    for (g, n) in global.iter().zip(&nominal) {
        assert!((g.x_mm - n.x_mm).abs() < 1e-9, "x correction {}", g.x_mm - n.x_mm);
        assert!((g.y_mm - n.y_mm).abs() < 1e-9, "y correction {}", g.y_mm - n.y_mm);
    }
}

#[test]
fn corrections_are_translation_invariant() {
    let nominal = square_nominal();
    let mut edges = consistent_edges();
    // Perturb one measurement so corrections are non-trivial.
    edges[0].shift.dx = 1012.5;

    let base = bundle_adjust(&nominal, PX_MM, &edges).unwrap();

    let shifted: Vec<StagePosition> = nominal
        .iter()
        .map(|p| pos(p.x_mm + 17.0, p.y_mm - 4.0))
        .collect();
    let moved = bundle_adjust(&shifted, PX_MM, &edges).unwrap();

    for i in 0..nominal.len() {
        let corr_a = base[i].x_mm - nominal[i].x_mm;
        let corr_b = moved[i].x_mm - shifted[i].x_mm;
        assert!((corr_a - corr_b).abs() < 1e-9);
        let corr_a = base[i].y_mm - nominal[i].y_mm;
        let corr_b = moved[i].y_mm - shifted[i].y_mm;
        assert!((corr_a - corr_b).abs() < 1e-9);
    }
}

#[test]
fn inconsistent_loop_is_averaged() {
    let nominal = square_nominal();
    let mut edges = consistent_edges();
    // 10 px disagreement around the loop; least squares must spread it
    // rather than satisfy any single edge exactly.
    edges[0].shift.dx = 1010.0;

    let global = bundle_adjust(&nominal, PX_MM, &edges).unwrap();
    let east_top = global[1].x_mm - global[0].x_mm;
    let east_bottom = global[3].x_mm - global[2].x_mm;
    assert!(east_top > 1.0 && east_top < 1.010);
    assert!(east_bottom >= 1.0 && east_bottom < east_top);
}

#[test]
fn disconnected_graph_fails_fast() {
    let nominal = vec![pos(0.0, 0.0), pos(1.0, 0.0), pos(2.0, 0.0)];
    let edges = vec![edge(0, 1, Direction::East, 0.0, 1000.0)];

    match bundle_adjust(&nominal, PX_MM, &edges) {
        Err(TesseraError::DisconnectedGrid { unreachable, total }) => {
            assert_eq!(unreachable, 1);
            assert_eq!(total, 3);
        }
        other => panic!("expected DisconnectedGrid, got {other:?}"),
    }
}

#[test]
fn empty_tile_set_is_rejected() {
    assert!(matches!(
        bundle_adjust(&[], PX_MM, &[]),
        Err(TesseraError::EmptyTileSet)
    ));
}

#[test]
fn single_tile_stays_at_nominal() {
    let nominal = vec![pos(2.5, -1.0)];
    let global = bundle_adjust(&nominal, PX_MM, &[]).unwrap();
    assert!((global[0].x_mm - 2.5).abs() < 1e-12);
    assert!((global[0].y_mm + 1.0).abs() < 1e-12);
}
