//! Concurrent fetch-then-persist pipeline
//!
//! Turns an enumerated tile list into stored tiles:
//!
//! - [`FetcherPool`] runs `W` stateless workers calling a [`TileSource`]
//! - [`StoreWriter`] owns the [`TileStore`] on a single thread
//! - [`PipelineOrchestrator`] wires the queues, waits for one
//!   acknowledgment per tile and tears everything down
//!
//! Fetches are retried per [`RetryPolicy`]; the first fatal error cancels
//! all workers through a shared `CancellationToken`.
//!
//! [`TileSource`]: crate::provider::TileSource
//! [`TileStore`]: crate::store::TileStore

mod fetcher;
mod orchestrator;
mod policy;
mod types;
mod writer;

#[cfg(test)]
pub(crate) mod mock;

pub use fetcher::FetcherPool;
pub use orchestrator::{PipelineOrchestrator, ProgressCallback};
pub use policy::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS,
};
pub use types::{Ack, PipelineError, PipelineOutcome, PipelineStats, Stage};
pub use writer::{StoreWriter, WriterOutput};
