//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.0511287798;
pub const MAX_LAT: f64 = 85.0511287798;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Edge length of a standard XYZ raster tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Deepest zoom level fetched by default.
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Upper limit for a configurable grid. `2^30` tiles per axis still fits
/// comfortably in the `u32` column/row fields and in SQLite integers.
pub const GRID_ZOOM_LIMIT: u8 = 30;

/// Default cap on the number of tiles a single enumeration may return.
pub const DEFAULT_MAX_TILES: usize = 10_000_000;

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range
    #[error("Invalid latitude: {0} (must be between -85.0511287798 and 85.0511287798)")]
    InvalidLatitude(f64),

    /// Longitude outside -180..=180
    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    /// Zoom level not covered by the tile grid
    #[error("Invalid zoom level: {zoom} (grid supports 0 to {max_zoom})")]
    InvalidZoom { zoom: u8, max_zoom: u8 },

    /// Zoom range with min above max
    #[error("Invalid zoom range: {min} > {max}")]
    InvalidZoomRange { min: u8, max: u8 },

    /// Bounding box whose west/south edge is not strictly below east/north
    #[error("Invalid bounding box: {reason}")]
    InvalidBoundingBox { reason: String },

    /// Tile grid with unusable parameters
    #[error("Invalid tile grid: {0}")]
    InvalidGrid(String),

    /// Enumeration larger than the configured tile budget
    #[error("Request covers {requested} tiles, more than the limit of {limit}")]
    TooManyTiles { requested: usize, limit: usize },
}

/// Identifies a single tile slot in the pyramid.
///
/// `(zoom, col, row)` is the natural key of the tile store. Rows count from
/// the north edge (XYZ / slippy-map convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Zoom level
    pub zoom: u8,
    /// X coordinate (west-east), 0 at the antimeridian
    pub col: u32,
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
}

impl TileId {
    /// Creates a tile identifier.
    pub const fn new(zoom: u8, col: u32, row: u32) -> Self {
        Self { zoom, col, row }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// Pixel position in the world pixel grid of one zoom level.
///
/// Values are already rounded but kept as `f64` since the world is
/// `tile_size * 2^zoom` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCoord {
    pub x: f64,
    pub y: f64,
}

/// Geographic rectangle in degrees: west, south, east, north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl BoundingBox {
    /// Creates a validated bounding box.
    ///
    /// Latitudes outside the Web Mercator range are rejected, not clamped.
    /// NaN fails every range check.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, CoordError> {
        for lon in [xmin, xmax] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        for lat in [ymin, ymax] {
            if !(MIN_LAT..=MAX_LAT).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        if xmin >= xmax {
            return Err(CoordError::InvalidBoundingBox {
                reason: format!("xmin {} must be less than xmax {}", xmin, xmax),
            });
        }
        if ymin >= ymax {
            return Err(CoordError::InvalidBoundingBox {
                reason: format!("ymin {} must be less than ymax {}", ymin, ymax),
            });
        }

        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    /// The whole Web Mercator world.
    pub fn world() -> Self {
        Self {
            xmin: MIN_LON,
            ymin: MIN_LAT,
            xmax: MAX_LON,
            ymax: MAX_LAT,
        }
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// North-west corner as `(lon, lat)`.
    pub fn top_left(&self) -> (f64, f64) {
        (self.xmin, self.ymax)
    }

    /// South-east corner as `(lon, lat)`.
    pub fn bottom_right(&self) -> (f64, f64) {
        (self.xmax, self.ymin)
    }

    /// Geometric center as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        ((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }
}

impl fmt::Display for BoundingBox {
    /// Formats as `west,south,east,north`, the MBTiles `bounds` layout.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Inclusive range of zoom levels to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

impl ZoomRange {
    /// Creates an inclusive zoom range.
    pub fn new(min: u8, max: u8) -> Result<Self, CoordError> {
        if min > max {
            return Err(CoordError::InvalidZoomRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Full pyramid from `zoom` down to the grid's deepest level.
    ///
    /// Requesting zoom 15 on a default grid fetches 15 through 19.
    pub fn from_zoom(zoom: u8, grid: &TileGrid) -> Result<Self, CoordError> {
        if zoom > grid.max_zoom() {
            return Err(CoordError::InvalidZoom {
                zoom,
                max_zoom: grid.max_zoom(),
            });
        }
        Ok(Self {
            min: zoom,
            max: grid.max_zoom(),
        })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Iterates zoom levels in ascending order.
    pub fn levels(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }

    /// Number of zoom levels; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }
}

/// Tile grid parameters: tile edge length and deepest zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    tile_size: u32,
    max_zoom: u8,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl TileGrid {
    /// Creates a grid, rejecting a zero tile size or a zoom beyond
    /// [`GRID_ZOOM_LIMIT`].
    pub fn new(tile_size: u32, max_zoom: u8) -> Result<Self, CoordError> {
        if tile_size == 0 {
            return Err(CoordError::InvalidGrid(
                "tile size must be greater than zero".to_string(),
            ));
        }
        if max_zoom > GRID_ZOOM_LIMIT {
            return Err(CoordError::InvalidGrid(format!(
                "max zoom {} exceeds limit {}",
                max_zoom, GRID_ZOOM_LIMIT
            )));
        }
        Ok(Self {
            tile_size,
            max_zoom,
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Number of tiles per axis at `zoom` (`2^zoom`).
    pub fn tiles_per_axis(zoom: u8) -> u64 {
        1u64 << zoom
    }
}

/// Upper clipping bound applied to enumerated column/row indices.
///
/// The valid grid at zoom `z` is `[0, 2^z)`. A box touching the east edge
/// (longitude 180) or the south edge (latitude -85.0511) projects to pixel
/// `tile_size * 2^z`, i.e. index `2^z`, one past the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeClip {
    /// Keep indices in `[0, 2^z)`.
    #[default]
    Exact,
    /// Keep indices in `[0, 2^z]`, admitting one index past the east/south
    /// edge. Matches the behavior of older mbtiles fetchers.
    Inclusive,
}

impl EdgeClip {
    /// Largest index kept at `zoom`.
    pub fn last_index(&self, zoom: u8) -> i64 {
        let n = TileGrid::tiles_per_axis(zoom) as i64;
        match self {
            EdgeClip::Exact => n - 1,
            EdgeClip::Inclusive => n,
        }
    }

    /// Parses `exact` / `inclusive` (case-insensitive).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Some(EdgeClip::Exact),
            "inclusive" => Some(EdgeClip::Inclusive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeClip::Exact => "exact",
            EdgeClip::Inclusive => "inclusive",
        }
    }
}

/// Clipped column and row ranges for one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomTileRange {
    pub zoom: u8,
    /// Inclusive column range, `None` when fully clipped
    pub cols: Option<(u32, u32)>,
    /// Inclusive row range, `None` when fully clipped
    pub rows: Option<(u32, u32)>,
}

impl ZoomTileRange {
    /// Number of tiles covered by this range.
    pub fn tile_count(&self) -> usize {
        match (self.cols, self.rows) {
            (Some((c0, c1)), Some((r0, r1))) => {
                ((c1 - c0) as usize + 1).saturating_mul((r1 - r0) as usize + 1)
            }
            _ => 0,
        }
    }

    /// Iterates tile ids column-major: ascending column, then ascending row.
    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        let zoom = self.zoom;
        let cols = self.cols;
        let rows = self.rows;
        cols.zip(rows)
            .into_iter()
            .flat_map(move |((c0, c1), (r0, r1))| {
                (c0..=c1).flat_map(move |col| (r0..=r1).map(move |row| TileId { zoom, col, row }))
            })
    }
}
