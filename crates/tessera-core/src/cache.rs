//! Byte-budgeted, thread-safe LRU store of decoded tiles.
//!
//! The arena is explicit: a key map plus an ordered recency map driven by
//! a monotonic tick. One mutex serializes the whole
//! check-load-insert-evict sequence, so concurrent callers racing on the
//! same missing key trigger exactly one underlying load and readers never
//! observe a partially updated arena.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use ndarray::Array2;
use tracing::trace;

use crate::error::{Result, TesseraError};
use crate::source::TileSource;
use crate::tile::TileKey;

struct CacheEntry {
    data: Arc<Array2<f32>>,
    bytes: usize,
    tick: u64,
}

struct CacheInner {
    entries: HashMap<TileKey, CacheEntry>,
    /// tick -> key, oldest first. Ticks are unique, so this is a strict
    /// least-recently-used order.
    recency: BTreeMap<u64, TileKey>,
    resident_bytes: usize,
    next_tick: u64,
}

pub struct TileCache {
    source: Box<dyn TileSource>,
    max_bytes: usize,
    inner: Mutex<CacheInner>,
}

impl TileCache {
    pub fn new(source: Box<dyn TileSource>, max_bytes: usize) -> Self {
        Self {
            source,
            max_bytes,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                resident_bytes: 0,
                next_tick: 0,
            }),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Fetch a tile, loading it through the source on a miss.
    ///
    /// The load happens inside the cache lock: slower under contention,
    /// but it guarantees at most one load per key no matter how many
    /// callers race on the same miss.
    pub fn get(&self, key: TileKey) -> Result<Arc<Array2<f32>>> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        if let Some(entry) = inner.entries.get(&key) {
            let (data, old_tick) = (Arc::clone(&entry.data), entry.tick);
            touch(&mut inner, key, old_tick);
            return Ok(data);
        }

        let data = self.source.load_tile(key.fov, key.z, key.level)?;
        let data = Arc::new(data);
        self.insert_locked(&mut inner, key, Arc::clone(&data))?;
        Ok(data)
    }

    /// Store a tile directly, evicting least-recently-used entries until
    /// it fits. A single tile larger than the whole budget is rejected
    /// and never partially stored.
    pub fn put(&self, key: TileKey, data: Array2<f32>) -> Result<()> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        self.insert_locked(&mut inner, key, Arc::new(data))
    }

    pub fn contains(&self, key: TileKey) -> bool {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.contains_key(&key)
    }

    pub fn resident_bytes(&self) -> usize {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        inner.resident_bytes
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_locked(
        &self,
        inner: &mut CacheInner,
        key: TileKey,
        data: Arc<Array2<f32>>,
    ) -> Result<()> {
        let bytes = data.len() * std::mem::size_of::<f32>();
        if bytes > self.max_bytes {
            return Err(TesseraError::TileTooLarge {
                size: bytes,
                max_bytes: self.max_bytes,
            });
        }

        // At most one entry per key: replace, reclaiming the old bytes.
        if let Some(old) = inner.entries.remove(&key) {
            inner.recency.remove(&old.tick);
            inner.resident_bytes -= old.bytes;
        }

        while inner.resident_bytes + bytes > self.max_bytes {
            let (&oldest_tick, &victim) = inner
                .recency
                .iter()
                .next()
                .expect("resident bytes imply at least one entry");
            inner.recency.remove(&oldest_tick);
            let evicted = inner
                .entries
                .remove(&victim)
                .expect("recency and entries stay in sync");
            inner.resident_bytes -= evicted.bytes;
            trace!(?victim, bytes = evicted.bytes, "evicted tile");
        }

        let tick = inner.next_tick;
        inner.next_tick += 1;
        inner.recency.insert(tick, key);
        inner.entries.insert(key, CacheEntry { data, bytes, tick });
        inner.resident_bytes += bytes;
        Ok(())
    }
}

/// Mark `key` most recently used.
fn touch(inner: &mut CacheInner, key: TileKey, old_tick: u64) {
    let tick = inner.next_tick;
    inner.next_tick += 1;
    inner.recency.remove(&old_tick);
    inner.recency.insert(tick, key);
    if let Some(entry) = inner.entries.get_mut(&key) {
        entry.tick = tick;
    }
}
