//! Pipeline orchestrator.
//!
//! Wires the request → fetch → store conveyor for one run:
//!
//! ```text
//!   feeder ──requests──▶ FetcherPool (W) ──fetched──▶ StoreWriter (1)
//!                              │                           │
//!                              └────────── acks ───────────┴──▶ orchestrator
//! ```
//!
//! The calling thread only waits on acknowledgments. The first failure
//! cancels every stage; all threads are joined before `run` returns, on
//! success and failure alike.

use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fetcher::FetcherPool;
use super::policy::CANCEL_POLL_INTERVAL;
use super::types::{Ack, PipelineError, PipelineOutcome, PipelineStats, Stage};
use super::writer::StoreWriter;
use crate::config::DownloadConfig;
use crate::coord::TileId;
use crate::provider::TileSource;
use crate::store::TileStore;

const FEEDER_THREAD_NAME: &str = "tile-feeder";

/// Progress callback: `(completed, total)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Runs tile lists through the fetch and store stages.
pub struct PipelineOrchestrator {
    source: Arc<dyn TileSource>,
    config: DownloadConfig,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl PipelineOrchestrator {
    pub fn new(source: Arc<dyn TileSource>, config: DownloadConfig) -> Self {
        Self {
            source,
            config,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Uses a caller-owned token; cancelling it aborts the run with
    /// [`PipelineError::Cancelled`].
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Fetches and stores every tile in `tiles`.
    ///
    /// Returns once `tiles.len()` acknowledgments have arrived and every
    /// worker has exited. On error the store is dropped, which closes it.
    pub fn run<S>(&self, tiles: Vec<TileId>, store: S) -> Result<PipelineOutcome<S>, PipelineError>
    where
        S: TileStore + 'static,
    {
        let started = Instant::now();
        let total = tiles.len();
        // Internal failures must not cancel the caller's token
        let cancel = self.cancel.child_token();
        let capacity = self.config.channel_capacity().max(1);

        let (request_tx, request_rx) = sync_channel::<TileId>(capacity);
        let (tile_tx, tile_rx) = sync_channel(capacity);
        let (ack_tx, ack_rx) = sync_channel::<Ack>(capacity);

        info!(
            tiles = total,
            workers = self.config.workers(),
            source = self.source.name(),
            "Starting tile pipeline"
        );

        let writer = StoreWriter::spawn(store, cancel.clone(), tile_rx, ack_tx.clone())?;

        let fetchers = match FetcherPool::spawn(
            self.config.workers(),
            Arc::clone(&self.source),
            self.config.retry_policy(),
            cancel.clone(),
            request_rx,
            tile_tx,
            ack_tx,
        ) {
            Ok(pool) => pool,
            Err(e) => {
                cancel.cancel();
                let _ = writer.join();
                return Err(e);
            }
        };

        let cancel_feeder = cancel.clone();
        let feeder = thread::Builder::new()
            .name(FEEDER_THREAD_NAME.to_string())
            .spawn(move || {
                for tile in tiles {
                    if cancel_feeder.is_cancelled() || request_tx.send(tile).is_err() {
                        break;
                    }
                }
            });
        let feeder = match feeder {
            Ok(handle) => handle,
            Err(source) => {
                cancel.cancel();
                let _ = fetchers.join();
                let _ = writer.join();
                return Err(PipelineError::Spawn {
                    name: FEEDER_THREAD_NAME.to_string(),
                    source,
                });
            }
        };

        let waited = self.await_acks(&ack_rx, total);

        // Stop whatever is still running, then unblock any pending ack send
        cancel.cancel();
        drop(ack_rx);

        let joined = join_all(feeder, fetchers, writer);

        let (completed, failure) = match waited {
            Ok(completed) => (completed, None),
            Err((completed, e)) => (completed, Some(e)),
        };

        match (failure, joined) {
            (None, Ok((output, retries))) => {
                let stats = PipelineStats {
                    tiles_stored: output.tiles_written,
                    bytes_stored: output.bytes_written,
                    retries,
                    elapsed: started.elapsed(),
                };
                info!(
                    tiles = stats.tiles_stored,
                    bytes = stats.bytes_stored,
                    retries = stats.retries,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "Tile pipeline complete"
                );
                Ok(PipelineOutcome {
                    store: output.store,
                    stats,
                })
            }
            // A panic explains a hang-up better than the hang-up itself
            (Some(PipelineError::Disconnected { .. }), Err(panic)) => Err(panic),
            (Some(e), _) | (None, Err(e)) => {
                warn!(completed, total, error = %e, "Tile pipeline failed");
                Err(e)
            }
        }
    }

    /// Blocks until `total` successful acks, the first failure, or
    /// cancellation by the caller.
    fn await_acks(
        &self,
        acks: &Receiver<Ack>,
        total: usize,
    ) -> Result<usize, (usize, PipelineError)> {
        let mut completed = 0;
        while completed < total {
            if self.cancel.is_cancelled() {
                return Err((completed, PipelineError::Cancelled));
            }
            match acks.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(Ok(tile)) => {
                    completed += 1;
                    debug!(%tile, completed, total, "Tile acknowledged");
                    if let Some(ref progress) = self.progress {
                        progress(completed, total);
                    }
                }
                Ok(Err(e)) => return Err((completed, e)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err((
                        completed,
                        PipelineError::Disconnected {
                            stage: Stage::Store,
                            acknowledged: completed,
                            expected: total,
                        },
                    ))
                }
            }
        }
        Ok(completed)
    }
}

/// Joins every stage, reporting the first panic.
fn join_all<S: TileStore + 'static>(
    feeder: JoinHandle<()>,
    fetchers: FetcherPool,
    writer: StoreWriter<S>,
) -> Result<(super::writer::WriterOutput<S>, u64), PipelineError> {
    let feeder = feeder
        .join()
        .map_err(|_| PipelineError::WorkerPanicked(FEEDER_THREAD_NAME.to_string()));
    let retries = fetchers.join();
    let output = writer.join();
    feeder?;
    Ok((output?, retries?))
}
