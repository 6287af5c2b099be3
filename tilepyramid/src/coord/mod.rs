//! Coordinate conversion module
//!
//! Provides the Web Mercator math that turns a geographic bounding box into
//! the exact set of `(zoom, col, row)` tiles covering it:
//!
//! - [`Projector`] converts longitude/latitude to world pixel coordinates
//! - [`TileEnumerator`] derives clipped tile ranges per zoom level
//!
//! The tile edge length and deepest zoom come from a [`TileGrid`] rather than
//! globals, so tests can use small grids.

mod enumerate;
mod projection;
mod types;

#[cfg(test)]
mod tests;

pub use enumerate::TileEnumerator;
pub(crate) use enumerate::total_tiles;
pub use projection::{min_max, round_half_away_from_zero, Projector, ZoomConstants};
pub use types::{
    BoundingBox, CoordError, EdgeClip, PixelCoord, TileGrid, TileId, ZoomRange, ZoomTileRange,
    DEFAULT_MAX_TILES, DEFAULT_MAX_ZOOM, DEFAULT_TILE_SIZE, GRID_ZOOM_LIMIT, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};

use std::f64::consts::PI;

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the `(lat, lon)` of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileId) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

impl TileId {
    /// `(lat, lon)` of this tile's northwest corner.
    pub fn to_lat_lon(&self) -> (f64, f64) {
        tile_to_lat_lon(self)
    }
}
