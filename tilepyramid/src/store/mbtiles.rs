//! SQLite-backed MBTiles tile store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::metadata::Metadata;
use super::TileStore;
use crate::coord::TileId;
use crate::tile::Tile;

/// Bulk-load connection settings. Durability is traded for speed; a crashed
/// run is restarted from scratch anyway.
const LOAD_PRAGMAS: &str = "
    PRAGMA synchronous = 0;
    PRAGMA locking_mode = EXCLUSIVE;
    PRAGMA journal_mode = DELETE;
";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tiles (
        zoom_level INTEGER,
        tile_column INTEGER,
        tile_row INTEGER,
        tile_data BLOB
    );
    CREATE TABLE IF NOT EXISTS metadata (name TEXT, value TEXT);
    CREATE UNIQUE INDEX name ON metadata (name);
    CREATE UNIQUE INDEX tile_index ON tiles (zoom_level, tile_column, tile_row);
";

const INSERT_TILE: &str =
    "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)";

/// MBTiles file opened for a fresh bulk load.
///
/// The connection is released when the store is dropped; use
/// [`MbtilesStore::close`] to observe close errors.
pub struct MbtilesStore {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for MbtilesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MbtilesStore")
            .field("path", &self.path)
            .finish()
    }
}

impl MbtilesStore {
    /// Creates a new store at `path`, replacing any existing file.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed existing tile store"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::RemoveExisting { path, source }),
        }

        let conn = Connection::open(&path).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch(LOAD_PRAGMAS)
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;
        conn.execute_batch(SCHEMA).map_err(StoreError::Schema)?;

        info!(path = %path.display(), "Created tile store");
        Ok(Self { conn, path })
    }

    /// Opens an existing store for reading back results.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upserts every metadata row.
    pub fn write_metadata(&mut self, metadata: &Metadata) -> StoreResult<()> {
        let tx = self.conn.transaction().map_err(StoreError::Metadata)?;
        {
            let mut stmt = tx
                .prepare("INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)")
                .map_err(StoreError::Metadata)?;
            for (name, value) in metadata.to_rows() {
                stmt.execute(params![name, value])
                    .map_err(StoreError::Metadata)?;
            }
        }
        tx.commit().map_err(StoreError::Metadata)?;
        debug!(name = %metadata.name, "Wrote metadata");
        Ok(())
    }

    /// Value of a metadata row.
    pub fn metadata_value(&self, name: &str) -> StoreResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM metadata WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::Query)
    }

    /// Number of metadata rows.
    pub fn metadata_count(&self) -> StoreResult<usize> {
        self.count("SELECT COUNT(*) FROM metadata")
    }

    /// Number of stored tiles.
    pub fn tile_count(&self) -> StoreResult<usize> {
        self.count("SELECT COUNT(*) FROM tiles")
    }

    fn count(&self, sql: &str) -> StoreResult<usize> {
        let n: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(StoreError::Query)?;
        Ok(n as usize)
    }

    /// All stored tile ids ordered by zoom, column, row.
    pub fn tile_ids(&self) -> StoreResult<Vec<TileId>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT zoom_level, tile_column, tile_row FROM tiles \
                 ORDER BY zoom_level, tile_column, tile_row",
            )
            .map_err(StoreError::Query)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TileId::new(row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(StoreError::Query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Query)
    }

    /// Payload of one tile.
    pub fn get_tile(&self, id: TileId) -> StoreResult<Option<Vec<u8>>> {
        self.conn
            .query_row(
                "SELECT tile_data FROM tiles \
                 WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                params![id.zoom, id.col, id.row],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::Query)
    }

    /// Payload of an arbitrary stored tile, used to sniff the image format.
    pub fn sample_tile(&self) -> StoreResult<Option<Vec<u8>>> {
        self.conn
            .query_row("SELECT tile_data FROM tiles LIMIT 1", [], |row| row.get(0))
            .optional()
            .map_err(StoreError::Query)
    }

    /// `CREATE` statements of every table and index, by name.
    pub fn schema_sql(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT sql FROM sqlite_master WHERE sql IS NOT NULL ORDER BY name")
            .map_err(StoreError::Query)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(StoreError::Query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Query)
    }

    /// Rebuilds planner statistics and reclaims free pages.
    pub fn optimize(&mut self) -> StoreResult<()> {
        self.conn
            .execute_batch("ANALYZE; VACUUM;")
            .map_err(StoreError::Maintenance)?;
        info!(path = %self.path.display(), "Optimized tile store");
        Ok(())
    }

    /// Closes the connection, reporting any error.
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Close(e))
    }
}

impl TileStore for MbtilesStore {
    fn insert_tile(&mut self, tile: &Tile) -> StoreResult<()> {
        let id = tile.id;
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_TILE)
            .map_err(|source| StoreError::Insert { tile: id, source })?;

        match stmt.execute(params![id.zoom, id.col, id.row, tile.data]) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateTile(id))
            }
            Err(source) => Err(StoreError::Insert { tile: id, source }),
        }
    }
}
