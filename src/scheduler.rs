//! # Render Scheduler
//!
//! Offloads viewport queries and tile rasterization to a dedicated worker
//! thread so gesture handling never blocks on a render.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     bounded channel      ┌──────────────────┐
//! │  Controller  │ ──RenderRequest(gen)──▶  │ Render Worker    │
//! │ (gesture     │                          │ (query + shade)  │
//! │  thread)     │ ◀───RenderTile(gen)───   │                  │
//! └──────────────┘     result channel       └──────────────────┘
//! ```
//!
//! # Generations and Staleness
//!
//! Every issued request is stamped from a shared monotonically increasing
//! generation counter. The worker skips requests that are already superseded,
//! re-checks after rendering, and the polling side drops any tile whose
//! generation is no longer the latest. Out-of-order frames can therefore
//! never reach the display; cancellation is cooperative via the generation
//! comparison, never a forced interruption.
//!
//! # Throttling
//!
//! While a gesture is active, interactive submissions are limited to one per
//! throttle interval (default 50 ms). A submission landing inside the window
//! parks in a single pending slot, replacing whatever was parked before; the
//! slot is flushed by [`RenderScheduler::flush_pending`] once the window
//! elapses or superseded by the settle render. The settle render issued at
//! gesture end bypasses the throttle entirely and is never dropped.
//!
//! # Error Handling
//!
//! A worker failure parks in a fail-fast error slot checked on every submit
//! and surfaced by [`RenderScheduler::finish`]. Dropping the scheduler
//! without calling `finish` joins the worker and logs a warning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::query::PeakSource;
use crate::render::{render_tile, Colormap, RenderConfig, RenderRequest, RenderTile};
use crate::view::ViewWindow;

/// Default minimum interval between interactive renders
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(50);

/// Job queue depth; submissions block once this many requests are queued
const JOB_QUEUE_CAPACITY: usize = 8;

/// Result queue depth; sized above the job queue so a draining `finish`
/// always leaves the worker room to send
const RESULT_QUEUE_CAPACITY: usize = 16;

/// Errors from the render scheduler
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The worker thread reported a render failure
    #[error("Render worker error: {0}")]
    Worker(String),

    /// The worker thread panicked
    #[error("Render worker thread panicked")]
    ThreadPanicked,

    /// The worker thread could not be spawned
    #[error("Failed to spawn render worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The scheduler was already finished
    #[error("Scheduler already finished")]
    Finished,
}

/// Interactive request parked while the throttle window is open
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    window: ViewWindow,
    colormap: Colormap,
    partition: Option<f64>,
}

/// Worker-thread render pipeline with generation-tagged requests.
///
/// One scheduler owns one worker thread for the lifetime of a loaded table.
/// Submissions come from a single control flow (the gesture handler), so the
/// throttle state needs no locking; the generation counter is shared with the
/// worker atomically.
pub struct RenderScheduler {
    /// Job sender (None after finish() is called)
    job_tx: Option<Sender<RenderRequest>>,
    /// Completed tiles, polled by the display side
    result_rx: Receiver<RenderTile>,
    /// Worker thread handle (None after finish() is called)
    handle: Option<JoinHandle<Result<(), String>>>,
    /// Latest generation issued; the staleness reference for worker and poller
    latest: Arc<AtomicU64>,
    /// First error encountered by the worker (fail-fast detection)
    first_error: Arc<Mutex<Option<String>>>,
    throttle: Duration,
    last_issued: Option<Instant>,
    pending: Option<PendingRequest>,
}

impl RenderScheduler {
    /// Spawn the render worker over `source`.
    ///
    /// The worker owns its clone of the source handle; table immutability
    /// makes concurrent queries safe without coordination.
    pub fn new(
        source: Arc<dyn PeakSource + Send + Sync>,
        config: RenderConfig,
    ) -> Result<Self, SchedulerError> {
        let (job_tx, job_rx) = bounded::<RenderRequest>(JOB_QUEUE_CAPACITY);
        let (result_tx, result_rx) = bounded::<RenderTile>(RESULT_QUEUE_CAPACITY);
        let latest = Arc::new(AtomicU64::new(0));
        let first_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let latest_clone = Arc::clone(&latest);
        let first_error_clone = Arc::clone(&first_error);

        let handle = thread::Builder::new()
            .name("mzscope-render".to_string())
            .spawn(move || {
                for request in job_rx {
                    let current = latest_clone.load(Ordering::SeqCst);
                    if request.generation < current {
                        log::debug!(
                            "Skipping superseded render request (generation {} < {})",
                            request.generation,
                            current
                        );
                        continue;
                    }

                    match render_tile(source.as_ref(), &request, &config) {
                        Ok(tile) => {
                            let current = latest_clone.load(Ordering::SeqCst);
                            if tile.generation < current {
                                log::debug!(
                                    "Discarding stale render result (generation {} < {})",
                                    tile.generation,
                                    current
                                );
                                continue;
                            }
                            if result_tx.send(tile).is_err() {
                                // Receiver gone, scheduler is shutting down
                                break;
                            }
                        }
                        Err(e) => {
                            let err_str = e.to_string();
                            *first_error_clone.lock().unwrap() = Some(err_str.clone());
                            return Err(err_str);
                        }
                    }
                }
                Ok(())
            })?;

        Ok(Self {
            job_tx: Some(job_tx),
            result_rx,
            handle: Some(handle),
            latest,
            first_error,
            throttle: DEFAULT_THROTTLE,
            last_issued: None,
            pending: None,
        })
    }

    /// Override the interactive throttle interval
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Latest generation issued so far
    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Submit a render for an in-progress gesture.
    ///
    /// Returns the issued generation, or `None` when the submission landed
    /// inside the throttle window and was parked (replacing any previously
    /// parked request).
    pub fn submit_interactive(
        &mut self,
        window: ViewWindow,
        colormap: Colormap,
        partition: Option<f64>,
    ) -> Result<Option<u64>, SchedulerError> {
        if self.throttle_open() {
            self.pending = None;
            return Ok(Some(self.issue(window, colormap, partition)?));
        }
        self.pending = Some(PendingRequest {
            window,
            colormap,
            partition,
        });
        log::trace!("Throttled interactive render, parked as pending");
        Ok(None)
    }

    /// Submit the settle render at gesture end.
    ///
    /// Bypasses the throttle and supersedes any parked request; this is the
    /// one render that is never dropped.
    pub fn submit_settle(
        &mut self,
        window: ViewWindow,
        colormap: Colormap,
        partition: Option<f64>,
    ) -> Result<u64, SchedulerError> {
        self.pending = None;
        self.issue(window, colormap, partition)
    }

    /// Issue the parked request if the throttle window has elapsed.
    ///
    /// Call this from the gesture loop's idle path so the last motion inside
    /// a window still produces a frame when no further events arrive.
    pub fn flush_pending(&mut self) -> Result<Option<u64>, SchedulerError> {
        if !self.throttle_open() {
            return Ok(None);
        }
        match self.pending.take() {
            Some(p) => Ok(Some(self.issue(p.window, p.colormap, p.partition)?)),
            None => Ok(None),
        }
    }

    /// Poll for a completed tile without blocking.
    ///
    /// Tiles whose generation is no longer the latest are dropped here, never
    /// returned.
    pub fn try_recv_tile(&self) -> Option<RenderTile> {
        while let Ok(tile) = self.result_rx.try_recv() {
            let current = self.latest.load(Ordering::SeqCst);
            if tile.generation == current {
                return Some(tile);
            }
            log::debug!(
                "Dropping stale tile (generation {} < {})",
                tile.generation,
                current
            );
        }
        None
    }

    /// Wait up to `timeout` for a tile of the latest generation
    pub fn recv_tile_timeout(&self, timeout: Duration) -> Option<RenderTile> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return None;
            };
            match self.result_rx.recv_timeout(remaining) {
                Ok(tile) => {
                    let current = self.latest.load(Ordering::SeqCst);
                    if tile.generation == current {
                        return Some(tile);
                    }
                    log::debug!(
                        "Dropping stale tile (generation {} < {})",
                        tile.generation,
                        current
                    );
                }
                Err(_) => return None,
            }
        }
    }

    /// Check whether the worker has failed, without submitting
    pub fn check_error(&self) -> Result<(), SchedulerError> {
        if let Some(ref err) = *self.first_error.lock().unwrap() {
            return Err(SchedulerError::Worker(err.clone()));
        }
        Ok(())
    }

    /// Shut down: close the job queue, join the worker, surface any error
    pub fn finish(mut self) -> Result<(), SchedulerError> {
        self.job_tx.take();
        let handle = self.handle.take().ok_or(SchedulerError::Finished)?;

        // Unblock a worker parked on a full result queue
        while self.result_rx.try_recv().is_ok() {}

        match handle.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err_str)) => Err(SchedulerError::Worker(err_str)),
            Err(_panic) => Err(SchedulerError::ThreadPanicked),
        }
    }

    fn throttle_open(&self) -> bool {
        match self.last_issued {
            Some(at) => at.elapsed() >= self.throttle,
            None => true,
        }
    }

    fn issue(
        &mut self,
        window: ViewWindow,
        colormap: Colormap,
        partition: Option<f64>,
    ) -> Result<u64, SchedulerError> {
        self.check_error()?;

        let sender = self.job_tx.as_ref().ok_or(SchedulerError::Finished)?;
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let request = RenderRequest {
            window,
            colormap,
            partition,
            generation,
        };

        sender.send(request).map_err(|_| {
            let err_guard = self.first_error.lock().unwrap();
            match err_guard.as_ref() {
                Some(msg) => SchedulerError::Worker(msg.clone()),
                None => SchedulerError::Worker("Render worker exited unexpectedly".to_string()),
            }
        })?;

        self.last_issued = Some(Instant::now());
        Ok(generation)
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if self.job_tx.is_some() || self.handle.is_some() {
            self.job_tx.take();
            if let Some(handle) = self.handle.take() {
                log::warn!("RenderScheduler dropped without calling finish()");
                while self.result_rx.try_recv().is_ok() {}
                let _ = handle.join();
            }
        }
    }
}
