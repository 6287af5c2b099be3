//! Spherical Web Mercator forward projection to world pixel coordinates.

use std::f64::consts::PI;

use super::types::{CoordError, PixelCoord, TileGrid};

const DEG_TO_RAD: f64 = PI / 180.0;

/// `sin(lat)` is clamped to this magnitude before taking the Mercator log.
const SIN_LAT_LIMIT: f64 = 0.9999;

/// Rounds half away from zero: `2.5 -> 3`, `-2.5 -> -3`.
///
/// Spelled out as `ceil(v - 0.5)` for negative values and `floor(v + 0.5)`
/// otherwise. Tile boundary inclusion depends on this exact form.
#[inline]
pub fn round_half_away_from_zero(value: f64) -> f64 {
    if value < 0.0 {
        (value - 0.5).ceil()
    } else {
        (value + 0.5).floor()
    }
}

/// `min(max(a, b), c)`.
///
/// Not `f64::clamp`: `f64::max` and `f64::min` both prefer the non-NaN
/// operand, so a NaN `a` yields `b`.
#[inline]
pub fn min_max(a: f64, b: f64, c: f64) -> f64 {
    a.max(b).min(c)
}

/// Per-zoom projection scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomConstants {
    /// World width in pixels (`tile_size * 2^zoom`)
    pub tile_span: f64,
    /// Pixel origin used for both axes (`tile_span / 2`)
    pub origin: f64,
    /// Pixels per degree of longitude
    pub lon_scale: f64,
    /// Pixels per radian for the Mercator latitude term
    pub lat_scale: f64,
}

impl ZoomConstants {
    fn for_span(tile_span: f64) -> Self {
        Self {
            tile_span,
            origin: tile_span / 2.0,
            lon_scale: tile_span / 360.0,
            lat_scale: tile_span / (2.0 * PI),
        }
    }
}

/// Projects longitude/latitude to pixel coordinates for every zoom level of a
/// [`TileGrid`].
///
/// The per-zoom constants are computed once in [`Projector::new`] and never
/// change afterwards.
#[derive(Debug, Clone)]
pub struct Projector {
    grid: TileGrid,
    levels: Vec<ZoomConstants>,
}

impl Projector {
    /// Builds constants for zoom `0..=grid.max_zoom()`.
    pub fn new(grid: TileGrid) -> Self {
        let mut levels = Vec::with_capacity(grid.max_zoom() as usize + 1);
        let mut span = grid.tile_size() as f64;
        for _ in 0..=grid.max_zoom() {
            levels.push(ZoomConstants::for_span(span));
            span *= 2.0;
        }
        Self { grid, levels }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Constants for `zoom`, or `None` beyond the grid.
    pub fn constants(&self, zoom: u8) -> Option<&ZoomConstants> {
        self.levels.get(zoom as usize)
    }

    /// Projects `(lon, lat)` in degrees to rounded world pixels at `zoom`.
    ///
    /// Inputs are not range-checked here; [`super::BoundingBox`] does that.
    pub fn project_pixels(&self, lon: f64, lat: f64, zoom: u8) -> Result<PixelCoord, CoordError> {
        let c = self.constants(zoom).ok_or(CoordError::InvalidZoom {
            zoom,
            max_zoom: self.grid.max_zoom(),
        })?;

        let x = round_half_away_from_zero(c.origin + lon * c.lon_scale);

        let sin_lat = min_max((DEG_TO_RAD * lat).sin(), -SIN_LAT_LIMIT, SIN_LAT_LIMIT);
        // Operand order affects rounding at tile edges
        let y = round_half_away_from_zero(
            c.origin + 0.5 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() * -c.lat_scale,
        );

        Ok(PixelCoord { x, y })
    }
}
