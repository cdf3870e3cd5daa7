mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ndarray::Array2;

use common::{textured, StubSource};
use tessera_core::cache::TileCache;
use tessera_core::error::TesseraError;
use tessera_core::tile::TileKey;

const F32_BYTES: usize = std::mem::size_of::<f32>();

fn key(fov: u32) -> TileKey {
    TileKey::new(fov, 0, 1)
}

#[test]
fn put_then_get_returns_identical_bytes() {
    let tile = textured(16, 16, 9);
    let cache = TileCache::new(Box::new(StubSource::new(textured(16, 16, 1))), 1 << 20);

    cache.put(key(0), tile.clone()).unwrap();
    let got = cache.get(key(0)).unwrap();
    assert_eq!(got.as_ref(), &tile);
    assert_eq!(cache.resident_bytes(), 16 * 16 * F32_BYTES);
}

#[test]
fn miss_loads_through_source_once() {
    let source = StubSource::new(textured(8, 8, 2));
    let loads = Arc::clone(&source.loads);
    let cache = TileCache::new(Box::new(source), 1 << 20);

    cache.get(key(3)).unwrap();
    cache.get(key(3)).unwrap();
    cache.get(key(3)).unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn racing_misses_on_one_key_load_once() {
    let source = StubSource::with_delay(textured(32, 32, 4), Duration::from_millis(30));
    let loads = Arc::clone(&source.loads);
    let cache = Arc::new(TileCache::new(Box::new(source), 1 << 20));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get(key(5)).unwrap())
        })
        .collect();
    for h in handles {
        let tile = h.join().unwrap();
        assert_eq!(tile.dim(), (32, 32));
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn evicts_least_recently_used_first() {
    // Budget holds exactly three 4x4 tiles.
    let tile_bytes = 4 * 4 * F32_BYTES;
    let cache = TileCache::new(Box::new(StubSource::new(textured(4, 4, 0))), 3 * tile_bytes);

    for fov in 0..3 {
        cache.put(key(fov), Array2::from_elem((4, 4), fov as f32)).unwrap();
    }
    // Touch tile 0 so tile 1 is now the coldest.
    cache.get(key(0)).unwrap();

    cache.put(key(3), Array2::from_elem((4, 4), 3.0)).unwrap();

    assert!(cache.contains(key(0)));
    assert!(!cache.contains(key(1)));
    assert!(cache.contains(key(2)));
    assert!(cache.contains(key(3)));
    assert_eq!(cache.resident_bytes(), 3 * tile_bytes);
}

#[test]
fn replacing_a_key_reclaims_its_bytes() {
    let cache = TileCache::new(Box::new(StubSource::new(textured(4, 4, 0))), 1 << 20);
    cache.put(key(0), Array2::zeros((8, 8))).unwrap();
    cache.put(key(0), Array2::zeros((4, 4))).unwrap();

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.resident_bytes(), 4 * 4 * F32_BYTES);
}

#[test]
fn oversized_tile_is_rejected_whole() {
    let cache = TileCache::new(Box::new(StubSource::new(textured(4, 4, 0))), 64);
    cache.put(key(0), Array2::zeros((2, 2))).unwrap();

    let err = cache.put(key(1), Array2::zeros((16, 16))).unwrap_err();
    match err {
        TesseraError::TileTooLarge { size, max_bytes } => {
            assert_eq!(size, 16 * 16 * F32_BYTES);
            assert_eq!(max_bytes, 64);
        }
        other => panic!("expected TileTooLarge, got {other:?}"),
    }

    // The rejection must not disturb what was already resident.
    assert!(cache.contains(key(0)));
    assert_eq!(cache.resident_bytes(), 2 * 2 * F32_BYTES);
}

#[test]
fn distinct_levels_are_distinct_entries() {
    let cache = TileCache::new(Box::new(StubSource::new(textured(4, 4, 0))), 1 << 20);
    cache.put(TileKey::new(0, 0, 1), Array2::zeros((4, 4))).unwrap();
    cache.put(TileKey::new(0, 0, 4), Array2::zeros((2, 2))).unwrap();
    assert_eq!(cache.len(), 2);
}
