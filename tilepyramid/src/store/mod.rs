//! Tile persistence
//!
//! Fetched tiles land in a single-file MBTiles container: a SQLite database
//! with a `tiles` table keyed uniquely on `(zoom_level, tile_column,
//! tile_row)` and a `metadata` name/value table.
//!
//! The pipeline writes through the [`TileStore`] trait so tests can swap in
//! failing stores; [`MbtilesStore`] is the real implementation.

mod error;
mod mbtiles;
mod metadata;

pub use error::{StoreError, StoreResult};
pub use mbtiles::MbtilesStore;
pub use metadata::Metadata;

use crate::tile::Tile;

/// Destination for fetched tiles.
///
/// Implementations are owned by exactly one writer thread; they need to be
/// `Send` but never shared.
pub trait TileStore: Send {
    /// Persists one tile. An existing key is [`StoreError::DuplicateTile`].
    fn insert_tile(&mut self, tile: &Tile) -> StoreResult<()>;
}

impl<T: TileStore + ?Sized> TileStore for Box<T> {
    fn insert_tile(&mut self, tile: &Tile) -> StoreResult<()> {
        (**self).insert_tile(tile)
    }
}
