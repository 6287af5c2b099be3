//! Build errors.

use thiserror::Error;

use crate::coord::{CoordError, TileId};
use crate::pipeline::{PipelineError, Stage};
use crate::store::StoreError;

/// Errors that abort a pyramid build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Bounding box, zoom or grid rejected before any work started
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] CoordError),

    /// Creating the output, or finalizing it after a successful run
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A tile failed to fetch or store; the output is left incomplete
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl BuildError {
    /// The failing tile, for fetch and store failures.
    pub fn tile(&self) -> Option<TileId> {
        match self {
            BuildError::Pipeline(e) => e.tile(),
            _ => None,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            BuildError::Pipeline(e) => e.stage(),
            _ => None,
        }
    }

    /// Whether the run was stopped by the caller rather than by a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Pipeline(PipelineError::Cancelled))
    }
}
