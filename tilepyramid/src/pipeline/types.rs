//! Pipeline types: errors, stages and run statistics.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::coord::TileId;
use crate::provider::ProviderError;
use crate::store::StoreError;

/// Pipeline stage a tile failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Store => write!(f, "store"),
        }
    }
}

/// Errors that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A tile could not be fetched within its attempt budget
    #[error("fetch stage failed for tile {tile} after {attempts} attempt(s): {source}")]
    Fetch {
        tile: TileId,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// A fetched tile could not be persisted
    #[error("store stage failed for tile {tile}: {source}")]
    Store {
        tile: TileId,
        #[source]
        source: StoreError,
    },

    /// The caller's cancellation token fired
    #[error("pipeline cancelled")]
    Cancelled,

    /// A stage hung up before every tile was acknowledged
    #[error("{stage} stage stopped after {acknowledged} of {expected} tiles")]
    Disconnected {
        stage: Stage,
        acknowledged: usize,
        expected: usize,
    },

    /// A worker thread could not be started
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked
    #[error("{0} thread panicked")]
    WorkerPanicked(String),
}

impl PipelineError {
    /// The tile the failure is attributed to, if any.
    pub fn tile(&self) -> Option<TileId> {
        match self {
            PipelineError::Fetch { tile, .. } | PipelineError::Store { tile, .. } => Some(*tile),
            _ => None,
        }
    }

    /// The stage the failure is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Fetch { .. } => Some(Stage::Fetch),
            PipelineError::Store { .. } => Some(Stage::Store),
            PipelineError::Disconnected { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Per-tile acknowledgment sent back to the orchestrator.
pub type Ack = Result<TileId, PipelineError>;

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Tiles acknowledged by the writer
    pub tiles_stored: usize,
    /// Payload bytes written
    pub bytes_stored: u64,
    /// Fetch attempts beyond the first, across all tiles
    pub retries: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl PipelineStats {
    /// Stored tiles per second.
    pub fn tiles_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tiles_stored as f64 / secs
        } else {
            0.0
        }
    }
}

/// Result of a completed run: the store handed back plus counters.
#[derive(Debug)]
pub struct PipelineOutcome<S> {
    pub store: S,
    pub stats: PipelineStats,
}
