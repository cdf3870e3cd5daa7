//! Background re-registration of the visible tile subset.
//!
//! Every view-change event selects the tiles whose centers fall in the
//! viewport, pulls them through the cache, and hands registration plus
//! compositing to a small fixed worker pool. Completions are posted on a
//! channel whose receiver belongs to the UI-owning thread; the display
//! keeps its last successful composite until a newer job succeeds.
//!
//! Nothing in flight is cancelled, so a slow early job can finish after
//! a fast late one: the displayed image reflects whichever completion
//! arrives last. Events carry a monotonically increasing sequence number
//! so a consumer may discard stale completions, but by default the race
//! is left as-is.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use ndarray::Array2;
use tracing::{debug, warn};

use crate::align::backend::RegistrationBackend;
use crate::cache::TileCache;
use crate::consts::DEFAULT_VIEWPORT_WORKERS;
use crate::error::Result;
use crate::tile::TileKey;

use super::{composite, level_for_zoom, visible_fovs, Viewport};

/// Posted on the controller's event channel; drained by the UI thread.
#[derive(Debug)]
pub enum ControllerEvent {
    /// A registration job finished; swap the displayed image.
    Composite {
        sequence: u64,
        level: u32,
        image: Array2<f32>,
    },
    /// A registration job failed; keep the previous image.
    Failed { sequence: u64, message: String },
}

/// Whether any re-registration job is still in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Computing,
}

pub struct ViewportController {
    cache: Arc<TileCache>,
    backend: Arc<dyn RegistrationBackend>,
    /// Precomputed (fov, (y, x)) tile centers in displayed-layer pixels.
    tile_centers: Vec<(u32, (f64, f64))>,
    grid_rows: usize,
    grid_cols: usize,
    /// Pixel dimensions of the displayed layer, for viewport bounds.
    layer_dims: (usize, usize),
    z: u32,
    events: Sender<ControllerEvent>,
    pool: WorkerPool,
    in_flight: Arc<AtomicUsize>,
    next_sequence: AtomicU64,
}

impl ViewportController {
    /// Returns the controller and the receiving end of its event
    /// channel; the thread draining that receiver plays the role of the
    /// UI thread.
    pub fn new(
        cache: Arc<TileCache>,
        backend: Arc<dyn RegistrationBackend>,
        tile_centers: Vec<(u32, (f64, f64))>,
        grid_dims: (usize, usize),
        layer_dims: (usize, usize),
    ) -> (Self, Receiver<ControllerEvent>) {
        let (events, receiver) = mpsc::channel();
        let controller = Self {
            cache,
            backend,
            tile_centers,
            grid_rows: grid_dims.0,
            grid_cols: grid_dims.1,
            layer_dims,
            z: 0,
            events,
            pool: WorkerPool::new(DEFAULT_VIEWPORT_WORKERS),
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_sequence: AtomicU64::new(0),
        };
        (controller, receiver)
    }

    pub fn state(&self) -> ControllerState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            ControllerState::Computing
        } else {
            ControllerState::Idle
        }
    }

    /// Handle a pan/zoom event: select the visible tiles, fetch them
    /// (cache misses do their I/O right here, synchronously), and submit
    /// registration + compositing to the pool. Returns the job's
    /// sequence number, or `None` when nothing is visible.
    pub fn on_view_changed(&self, viewport: Viewport) -> Result<Option<u64>> {
        let bbox = viewport.bounds(self.layer_dims.0, self.layer_dims.1);
        let fovs = visible_fovs(&self.tile_centers, &bbox);
        if fovs.is_empty() {
            debug!(?bbox, "no tiles in view");
            return Ok(None);
        }

        let mut tiles = Vec::with_capacity(fovs.len());
        for &fov in &fovs {
            let tile = self.cache.get(TileKey::new(fov, self.z, 1))?;
            tiles.push(tile.as_ref().clone());
        }

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let level = level_for_zoom(viewport.zoom);
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let (rows, cols) = (self.grid_rows, self.grid_cols);

        in_flight.fetch_add(1, Ordering::SeqCst);
        debug!(sequence, tiles = tiles.len(), level, "submitting viewport job");

        self.pool.submit(move || {
            // Catch panics here rather than relying on the pool's
            // backstop: the in-flight count must come back down and the
            // failure must reach the event channel either way.
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                backend
                    .align_tiles(&tiles, rows, cols)
                    .and_then(|offsets| composite(&tiles, &offsets, level))
            }));

            let event = match outcome {
                Ok(Ok(image)) => ControllerEvent::Composite {
                    sequence,
                    level,
                    image,
                },
                Ok(Err(e)) => {
                    warn!(sequence, error = %e, "viewport registration failed");
                    ControllerEvent::Failed {
                        sequence,
                        message: e.to_string(),
                    }
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    warn!(sequence, message = %message, "viewport registration panicked");
                    ControllerEvent::Failed { sequence, message }
                }
            };

            // Receiver may be gone during teardown; nothing to do then.
            let _ = events.send(event);
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(Some(sequence))
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "registration job panicked".to_string()
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of registration worker threads.
struct WorkerPool {
    sender: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn new(workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                std::thread::Builder::new()
                    .name(format!("tessera-viewport-{i}"))
                    .spawn(move || loop {
                        let job = {
                            let guard = receiver.lock().expect("pool mutex poisoned");
                            guard.recv()
                        };
                        match job {
                            Ok(job) => {
                                // A panicking job must not take the worker
                                // down with it.
                                let caught = std::panic::catch_unwind(
                                    std::panic::AssertUnwindSafe(job),
                                );
                                if caught.is_err() {
                                    warn!("viewport job panicked");
                                }
                            }
                            Err(_) => break,
                        }
                    })
                    .expect("failed to spawn viewport worker")
            })
            .collect();

        Self {
            sender: Some(sender),
            handles,
        }
    }

    fn submit(&self, job: impl FnOnce() + Send + 'static) {
        self.sender
            .as_ref()
            .expect("pool sender lives until drop")
            .send(Box::new(job))
            .expect("worker threads outlive the pool handle");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets each worker drain and exit.
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
