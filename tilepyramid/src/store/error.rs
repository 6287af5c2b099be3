//! Tile store errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::coord::TileId;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the tile store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not remove a previous file at the output path
    #[error("failed to replace existing file {}: {source}", .path.display())]
    RemoveExisting {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Could not open or configure the database
    #[error("failed to open tile store {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Creating tables or indexes failed
    #[error("failed to create tile store schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// The `(zoom, col, row)` key is already present
    #[error("tile {0} is already stored")]
    DuplicateTile(TileId),

    /// Inserting a tile failed for any other reason
    #[error("failed to store tile {tile}: {source}")]
    Insert {
        tile: TileId,
        #[source]
        source: rusqlite::Error,
    },

    /// Writing metadata rows failed
    #[error("failed to write metadata: {0}")]
    Metadata(#[source] rusqlite::Error),

    /// Reading back from the store failed
    #[error("tile store query failed: {0}")]
    Query(#[source] rusqlite::Error),

    /// Post-load statistics or space reclamation failed
    #[error("tile store maintenance failed: {0}")]
    Maintenance(#[source] rusqlite::Error),

    /// Closing the connection failed
    #[error("failed to close tile store: {0}")]
    Close(#[source] rusqlite::Error),
}
