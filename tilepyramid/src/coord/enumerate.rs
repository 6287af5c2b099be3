//! Bounding box to tile list enumeration.

use super::projection::Projector;
use super::types::{
    BoundingBox, EdgeClip, TileGrid, TileId, ZoomRange, ZoomTileRange, DEFAULT_MAX_TILES,
};
use super::CoordError;

/// Enumerates the tiles covering a bounding box across a zoom range.
///
/// For each zoom level the box's north-west and south-east corners are
/// projected to world pixels, divided by the tile size to get inclusive
/// column/row ranges, and clipped to the grid according to [`EdgeClip`].
///
/// # Example
///
/// ```
/// use tilepyramid::coord::{BoundingBox, TileEnumerator, TileGrid, ZoomRange};
///
/// let enumerator = TileEnumerator::new(TileGrid::default());
/// let bbox = BoundingBox::new(10.0, 10.0, 20.0, 20.0).unwrap();
/// let tiles = enumerator.tiles(&bbox, ZoomRange::new(2, 2).unwrap()).unwrap();
/// assert_eq!(tiles.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TileEnumerator {
    projector: Projector,
    edge_clip: EdgeClip,
    max_tiles: usize,
}

impl TileEnumerator {
    /// Creates an enumerator using [`EdgeClip::Exact`].
    pub fn new(grid: TileGrid) -> Self {
        Self {
            projector: Projector::new(grid),
            edge_clip: EdgeClip::default(),
            max_tiles: DEFAULT_MAX_TILES,
        }
    }

    /// Sets the upper clipping bound.
    pub fn with_edge_clip(mut self, edge_clip: EdgeClip) -> Self {
        self.edge_clip = edge_clip;
        self
    }

    /// Sets the tile budget for [`TileEnumerator::tiles`].
    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles;
        self
    }

    pub fn max_tiles(&self) -> usize {
        self.max_tiles
    }

    pub fn edge_clip(&self) -> EdgeClip {
        self.edge_clip
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Clipped column/row range for a single zoom level.
    pub fn zoom_range(&self, bbox: &BoundingBox, zoom: u8) -> Result<ZoomTileRange, CoordError> {
        let (west, north) = bbox.top_left();
        let (east, south) = bbox.bottom_right();
        let top_left = self.projector.project_pixels(west, north, zoom)?;
        let bottom_right = self.projector.project_pixels(east, south, zoom)?;

        let size = self.projector.grid().tile_size() as f64;
        let last = self.edge_clip.last_index(zoom);

        let cols = clip(
            (top_left.x / size).floor() as i64,
            (bottom_right.x / size).floor() as i64,
            last,
        );
        let rows = clip(
            (top_left.y / size).floor() as i64,
            (bottom_right.y / size).floor() as i64,
            last,
        );

        Ok(ZoomTileRange { zoom, cols, rows })
    }

    /// Per-zoom ranges for every level in `zooms`, ascending.
    pub fn ranges(
        &self,
        bbox: &BoundingBox,
        zooms: ZoomRange,
    ) -> Result<Vec<ZoomTileRange>, CoordError> {
        zooms
            .levels()
            .map(|zoom| self.zoom_range(bbox, zoom))
            .collect()
    }

    /// Total number of tiles [`TileEnumerator::tiles`] would return.
    pub fn count(&self, bbox: &BoundingBox, zooms: ZoomRange) -> Result<usize, CoordError> {
        Ok(total_tiles(&self.ranges(bbox, zooms)?))
    }

    /// Fails with [`CoordError::TooManyTiles`] when `requested` is over budget.
    pub fn check_budget(&self, requested: usize) -> Result<(), CoordError> {
        if requested > self.max_tiles {
            return Err(CoordError::TooManyTiles {
                requested,
                limit: self.max_tiles,
            });
        }
        Ok(())
    }

    /// Ordered tile list: ascending zoom, then column, then row.
    ///
    /// A zoom level whose ranges fall entirely outside the grid contributes
    /// nothing. The list never contains duplicates. Requests over the tile
    /// budget are rejected before anything is allocated.
    pub fn tiles(&self, bbox: &BoundingBox, zooms: ZoomRange) -> Result<Vec<TileId>, CoordError> {
        let ranges = self.ranges(bbox, zooms)?;
        let total = total_tiles(&ranges);
        self.check_budget(total)?;

        let mut tiles = Vec::with_capacity(total);
        for range in &ranges {
            tiles.extend(range.tiles());
        }
        Ok(tiles)
    }
}

/// Sum of per-zoom tile counts, saturating at `usize::MAX`.
pub(crate) fn total_tiles(ranges: &[ZoomTileRange]) -> usize {
    ranges
        .iter()
        .map(ZoomTileRange::tile_count)
        .fold(0usize, usize::saturating_add)
}

/// Intersects `[start, end]` with `[0, last]`.
fn clip(start: i64, end: i64, last: i64) -> Option<(u32, u32)> {
    let lo = start.max(0);
    let hi = end.min(last);
    if lo > hi {
        return None;
    }
    Some((lo as u32, hi as u32))
}
