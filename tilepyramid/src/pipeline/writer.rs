//! Single serialized store writer.

use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use super::policy::CANCEL_POLL_INTERVAL;
use super::types::{Ack, PipelineError};
use crate::store::TileStore;
use crate::tile::Tile;

const WRITER_THREAD_NAME: &str = "tile-writer";

/// What the writer thread hands back on exit.
#[derive(Debug)]
pub struct WriterOutput<S> {
    pub store: S,
    pub tiles_written: usize,
    pub bytes_written: u64,
}

/// The one thread allowed to touch the store.
pub struct StoreWriter<S> {
    handle: JoinHandle<WriterOutput<S>>,
}

impl<S: TileStore + 'static> StoreWriter<S> {
    /// Moves `store` onto a new writer thread.
    ///
    /// Each received tile gets exactly one insert followed by one
    /// acknowledgment. The thread stops when the fetched queue closes, the
    /// orchestrator hangs up, or `cancel` fires.
    pub fn spawn(
        store: S,
        cancel: CancellationToken,
        fetched: Receiver<Tile>,
        acks: SyncSender<Ack>,
    ) -> Result<Self, PipelineError> {
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || write_loop(store, cancel, fetched, acks))
            .map_err(|source| PipelineError::Spawn {
                name: WRITER_THREAD_NAME.to_string(),
                source,
            })?;
        Ok(Self { handle })
    }

    /// Waits for the writer and takes the store back.
    pub fn join(self) -> Result<WriterOutput<S>, PipelineError> {
        self.handle
            .join()
            .map_err(|_| PipelineError::WorkerPanicked(WRITER_THREAD_NAME.to_string()))
    }
}

fn write_loop<S: TileStore>(
    mut store: S,
    cancel: CancellationToken,
    fetched: Receiver<Tile>,
    acks: SyncSender<Ack>,
) -> WriterOutput<S> {
    let mut tiles_written = 0;
    let mut bytes_written = 0u64;

    while !cancel.is_cancelled() {
        let tile = match fetched.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(tile) => tile,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let ack = match store.insert_tile(&tile) {
            Ok(()) => {
                tiles_written += 1;
                bytes_written += tile.len() as u64;
                trace!(tile = %tile.id, bytes = tile.len(), "Stored tile");
                Ok(tile.id)
            }
            Err(source) => {
                error!(tile = %tile.id, error = %source, "Tile insert failed");
                Err(PipelineError::Store {
                    tile: tile.id,
                    source,
                })
            }
        };
        let failed = ack.is_err();

        if acks.send(ack).is_err() || failed {
            break;
        }
    }

    WriterOutput {
        store,
        tiles_written,
        bytes_written,
    }
}
