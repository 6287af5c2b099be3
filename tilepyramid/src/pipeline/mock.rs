//! Test doubles for the pipeline.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::coord::TileId;
use crate::provider::{ProviderError, TileSource};
use crate::store::{StoreError, StoreResult, TileStore};
use crate::tile::Tile;

/// Deterministic tile payload: the tile id as text.
pub fn payload_for(tile: TileId) -> Vec<u8> {
    tile.to_string().into_bytes()
}

/// Tile source with scripted per-tile failures.
#[derive(Default)]
pub struct MockTileSource {
    failures: Mutex<HashMap<TileId, VecDeque<ProviderError>>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl MockTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `times` fetches of `tile` fail with `error`.
    pub fn fail_times(self, tile: TileId, times: usize, error: ProviderError) -> Self {
        self.failures
            .lock()
            .entry(tile)
            .or_default()
            .extend(std::iter::repeat(error).take(times));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl TileSource for MockTileSource {
    fn fetch(&self, tile: TileId) -> Result<Vec<u8>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(queue) = self.failures.lock().get_mut(&tile) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }
        Ok(payload_for(tile))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// In-memory store that enforces key uniqueness like the real one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub tiles: HashMap<TileId, Vec<u8>>,
    pub fail_on: Option<TileId>,
}

impl TileStore for MemoryStore {
    fn insert_tile(&mut self, tile: &Tile) -> StoreResult<()> {
        if self.fail_on == Some(tile.id) || self.tiles.contains_key(&tile.id) {
            return Err(StoreError::DuplicateTile(tile.id));
        }
        self.tiles.insert(tile.id, tile.data.clone());
        Ok(())
    }
}
