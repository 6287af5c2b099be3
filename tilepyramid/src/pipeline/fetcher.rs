//! Fetcher pool: `W` interchangeable worker threads.
//!
//! Workers share the request receiver behind a mutex. Each loop iteration
//! takes one `TileId`, fetches it through the [`TileSource`] with retries,
//! and forwards the populated [`Tile`] to the writer. A fatal fetch error is
//! reported straight to the orchestrator on the acknowledgment channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::policy::{sleep_unless_cancelled, RetryPolicy, CANCEL_POLL_INTERVAL};
use super::types::{Ack, PipelineError};
use crate::coord::TileId;
use crate::provider::TileSource;
use crate::tile::Tile;

/// Handles of the running fetcher threads.
pub struct FetcherPool {
    handles: Vec<JoinHandle<()>>,
    retries: Arc<AtomicU64>,
}

struct Worker {
    id: usize,
    source: Arc<dyn TileSource>,
    retry: RetryPolicy,
    cancel: CancellationToken,
    requests: Arc<Mutex<Receiver<TileId>>>,
    fetched: SyncSender<Tile>,
    acks: SyncSender<Ack>,
    retries: Arc<AtomicU64>,
}

impl FetcherPool {
    /// Starts `workers` fetcher threads.
    ///
    /// Threads exit once `requests` is closed and drained, the writer hangs
    /// up, or `cancel` fires. If a thread cannot be spawned the already
    /// running ones are cancelled and joined before the error is returned.
    pub fn spawn(
        workers: usize,
        source: Arc<dyn TileSource>,
        retry: RetryPolicy,
        cancel: CancellationToken,
        requests: Receiver<TileId>,
        fetched: SyncSender<Tile>,
        acks: SyncSender<Ack>,
    ) -> Result<Self, PipelineError> {
        let requests = Arc::new(Mutex::new(requests));
        let retries = Arc::new(AtomicU64::new(0));
        let mut pool = Self {
            handles: Vec::with_capacity(workers),
            retries: Arc::clone(&retries),
        };

        for id in 0..workers.max(1) {
            let worker = Worker {
                id,
                source: Arc::clone(&source),
                retry,
                cancel: cancel.clone(),
                requests: Arc::clone(&requests),
                fetched: fetched.clone(),
                acks: acks.clone(),
                retries: Arc::clone(&retries),
            };
            let name = format!("tile-fetcher-{}", id);
            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker.run())
            {
                Ok(handle) => pool.handles.push(handle),
                Err(source) => {
                    cancel.cancel();
                    // Running workers see the token within one poll interval
                    let _ = pool.join();
                    return Err(PipelineError::Spawn { name, source });
                }
            }
        }

        debug!(workers = pool.handles.len(), "Fetcher pool started");
        Ok(pool)
    }

    /// Number of worker threads.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker and returns the total retry count.
    pub fn join(self) -> Result<u64, PipelineError> {
        let mut panicked = None;
        for (id, handle) in self.handles.into_iter().enumerate() {
            if handle.join().is_err() {
                panicked.get_or_insert(format!("tile-fetcher-{}", id));
            }
        }
        match panicked {
            Some(name) => Err(PipelineError::WorkerPanicked(name)),
            None => Ok(self.retries.load(Ordering::Relaxed)),
        }
    }
}

impl Worker {
    fn run(self) {
        while let Some(tile) = self.next_request() {
            match self.fetch_with_retry(tile) {
                Ok(data) => {
                    trace!(worker = self.id, %tile, bytes = data.len(), "Fetched tile");
                    if self.fetched.send(Tile::new(tile, data)).is_err() {
                        // Writer is gone
                        break;
                    }
                }
                Err(PipelineError::Cancelled) => break,
                Err(e) => {
                    warn!(worker = self.id, %tile, error = %e, "Tile fetch failed");
                    let _ = self.acks.send(Err(e));
                    break;
                }
            }
        }
        trace!(worker = self.id, "Fetcher exiting");
    }

    /// Next tile id, or `None` when the queue is drained or the run is over.
    fn next_request(&self) -> Option<TileId> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.requests.lock().recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(tile) => return Some(tile),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn fetch_with_retry(&self, tile: TileId) -> Result<Vec<u8>, PipelineError> {
        let mut attempt = 1;
        loop {
            let error = match self.source.fetch(tile) {
                Ok(data) => return Ok(data),
                Err(e) => e,
            };

            let delay = if error.is_retryable() {
                self.retry.delay_for_attempt(attempt)
            } else {
                None
            };
            let Some(delay) = delay else {
                return Err(PipelineError::Fetch {
                    tile,
                    attempts: attempt,
                    source: error,
                });
            };

            debug!(
                worker = self.id,
                %tile,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying tile fetch"
            );
            self.retries.fetch_add(1, Ordering::Relaxed);
            if !sleep_unless_cancelled(delay, &self.cancel) {
                return Err(PipelineError::Cancelled);
            }
            attempt += 1;
        }
    }
}
