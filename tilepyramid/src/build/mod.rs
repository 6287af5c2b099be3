//! End-to-end pyramid build
//!
//! [`PyramidBuilder`] ties the pieces together for one output file:
//!
//! 1. resolve the zoom range and enumerate tiles for the bounding box
//! 2. create the MBTiles file, replacing any previous one
//! 3. run the fetch/store pipeline
//! 4. on success, write metadata and optimize; on failure, skip both
//!
//! A file without `metadata` rows is therefore the marker of an incomplete
//! build.

mod error;

pub use error::BuildError;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::DownloadConfig;
use crate::coord::{BoundingBox, EdgeClip, TileEnumerator, TileGrid, ZoomRange, ZoomTileRange};
use crate::pipeline::{PipelineOrchestrator, PipelineStats, ProgressCallback};
use crate::provider::TileSource;
use crate::store::{MbtilesStore, Metadata};
use crate::tile::TileFormat;

/// What to build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub bbox: BoundingBox,
    /// Shallowest zoom; every level up to the grid's max zoom is included
    pub zoom: u8,
    pub output: PathBuf,
    /// Metadata `name`; defaults to the output file stem
    pub name: Option<String>,
    pub description: Option<String>,
    pub attribution: Option<String>,
    /// Run `ANALYZE`/`VACUUM` after loading
    pub optimize: bool,
}

impl BuildRequest {
    pub fn new(bbox: BoundingBox, zoom: u8, output: impl Into<PathBuf>) -> Self {
        Self {
            bbox,
            zoom,
            output: output.into(),
            name: None,
            description: None,
            attribution: None,
            optimize: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    fn metadata_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "tilepyramid".to_string())
        })
    }
}

/// Tile counts a request would produce, without fetching anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub zooms: ZoomRange,
    pub ranges: Vec<ZoomTileRange>,
}

impl BuildPlan {
    pub fn total_tiles(&self) -> usize {
        crate::coord::total_tiles(&self.ranges)
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output: PathBuf,
    pub zooms: ZoomRange,
    pub tiles_requested: usize,
    pub format: Option<TileFormat>,
    pub optimized: bool,
    pub stats: PipelineStats,
}

/// Builds MBTiles pyramids from a tile source.
pub struct PyramidBuilder {
    source: Arc<dyn TileSource>,
    enumerator: TileEnumerator,
    download: DownloadConfig,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl PyramidBuilder {
    pub fn new(source: Arc<dyn TileSource>, grid: TileGrid, download: DownloadConfig) -> Self {
        Self {
            source,
            enumerator: TileEnumerator::new(grid),
            download,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_edge_clip(mut self, edge_clip: EdgeClip) -> Self {
        self.enumerator = self.enumerator.with_edge_clip(edge_clip);
        self
    }

    /// Largest number of tiles a single build may request.
    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.enumerator = self.enumerator.with_max_tiles(max_tiles);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn grid(&self) -> &TileGrid {
        self.enumerator.projector().grid()
    }

    /// Per-zoom tile ranges for a request.
    ///
    /// The plan is returned even when it is over the tile budget so it can
    /// be shown; see [`PyramidBuilder::check_plan`].
    pub fn plan(&self, bbox: &BoundingBox, zoom: u8) -> Result<BuildPlan, BuildError> {
        let zooms = ZoomRange::from_zoom(zoom, self.grid())?;
        let ranges = self.enumerator.ranges(bbox, zooms)?;
        Ok(BuildPlan { zooms, ranges })
    }

    /// Rejects a plan larger than the tile budget.
    pub fn check_plan(&self, plan: &BuildPlan) -> Result<(), BuildError> {
        self.enumerator.check_budget(plan.total_tiles())?;
        Ok(())
    }

    /// Runs a full build into `request.output`.
    ///
    /// Requests over the tile budget fail before the output file is touched.
    pub fn build(&self, request: &BuildRequest) -> Result<BuildReport, BuildError> {
        let zooms = ZoomRange::from_zoom(request.zoom, self.grid())?;
        let tiles = self.enumerator.tiles(&request.bbox, zooms)?;
        let tiles_requested = tiles.len();

        info!(
            bbox = %request.bbox,
            min_zoom = zooms.min(),
            max_zoom = zooms.max(),
            tiles = tiles_requested,
            output = %request.output.display(),
            "Building tile pyramid"
        );

        let store = MbtilesStore::create(&request.output)?;

        let mut orchestrator = PipelineOrchestrator::new(Arc::clone(&self.source), self.download)
            .with_cancellation(self.cancel.clone());
        if let Some(ref progress) = self.progress {
            orchestrator = orchestrator.with_progress(Arc::clone(progress));
        }

        let outcome = orchestrator.run(tiles, store).map_err(|e| {
            error!(
                error = %e,
                output = %request.output.display(),
                "Build failed, output left without metadata"
            );
            e
        })?;
        let mut store = outcome.store;

        let format = store.sample_tile()?.and_then(|data| TileFormat::detect(&data));
        let mut metadata = Metadata::new(request.metadata_name(), request.bbox, zooms)
            .with_format(format);
        if let Some(ref description) = request.description {
            metadata = metadata.with_description(description.as_str());
        }
        if let Some(ref attribution) = request.attribution {
            metadata = metadata.with_attribution(attribution.as_str());
        }
        store.write_metadata(&metadata)?;

        if request.optimize {
            store.optimize()?;
        }
        store.close()?;

        info!(
            tiles = outcome.stats.tiles_stored,
            output = %request.output.display(),
            "Tile pyramid complete"
        );

        Ok(BuildReport {
            output: request.output.clone(),
            zooms,
            tiles_requested,
            format,
            optimized: request.optimize,
            stats: outcome.stats,
        })
    }
}

/// `true` when the file at `path` carries the metadata a completed build
/// writes.
pub fn is_complete(path: &Path) -> Result<bool, BuildError> {
    let store = MbtilesStore::open(path)?;
    Ok(store.metadata_value("name")?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{CoordError, DEFAULT_MAX_TILES};
    use crate::pipeline::mock::MockTileSource;
    use crate::pipeline::{RetryPolicy, Stage};
    use crate::provider::ProviderError;
    use tempfile::TempDir;

    fn dubai() -> BoundingBox {
        BoundingBox::new(55.397945, 25.291090, 55.402741, 25.292889).unwrap()
    }

    fn builder(source: MockTileSource) -> PyramidBuilder {
        PyramidBuilder::new(
            Arc::new(source),
            TileGrid::default(),
            DownloadConfig::new()
                .with_workers(4)
                .with_retry_policy(RetryPolicy::None),
        )
    }

    #[test]
    fn test_plan_counts_without_fetching() {
        let source = Arc::new(MockTileSource::new());
        let builder = PyramidBuilder::new(
            source.clone(),
            TileGrid::default(),
            DownloadConfig::default(),
        );

        let plan = builder.plan(&dubai(), 19).unwrap();

        assert_eq!(plan.zooms, ZoomRange::new(19, 19).unwrap());
        assert_eq!(plan.total_tiles(), 32);
        assert_eq!(source.fetch_count(), 0);
    }

    #[test]
    fn test_build_writes_tiles_and_metadata() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("dubai.mbtiles");

        let report = builder(MockTileSource::new())
            .build(&BuildRequest::new(dubai(), 19, &output))
            .unwrap();

        assert_eq!(report.tiles_requested, 32);
        assert_eq!(report.stats.tiles_stored, 32);
        assert!(report.optimized);
        // Mock payloads are not images
        assert_eq!(report.format, None);

        let store = MbtilesStore::open(&output).unwrap();
        assert_eq!(store.tile_count().unwrap(), 32);
        assert_eq!(store.metadata_value("name").unwrap().as_deref(), Some("dubai"));
        assert_eq!(store.metadata_value("minzoom").unwrap().as_deref(), Some("19"));
        assert!(is_complete(&output).unwrap());
    }

    #[test]
    fn test_failed_build_skips_metadata() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("broken.mbtiles");
        let bad = crate::coord::TileId::new(19, 342825, 224051);
        let source = MockTileSource::new().fail_times(
            bad,
            1,
            ProviderError::HttpStatus {
                status: 500,
                url: "http://mock".to_string(),
            },
        );

        let err = builder(source)
            .build(&BuildRequest::new(dubai(), 19, &output))
            .unwrap_err();

        assert_eq!(err.tile(), Some(bad));
        assert_eq!(err.stage(), Some(Stage::Fetch));
        assert!(!is_complete(&output).unwrap());
        let store = MbtilesStore::open(&output).unwrap();
        assert_eq!(store.metadata_count().unwrap(), 0);
    }

    #[test]
    fn test_empty_selection_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("empty.mbtiles");
        // A one-level grid where the box's projected pixels lie past the grid
        let grid = TileGrid::new(256, 0).unwrap();
        let bbox = BoundingBox::new(179.999, -85.0, 180.0, -84.99).unwrap();
        let builder = PyramidBuilder::new(
            Arc::new(MockTileSource::new()),
            grid,
            DownloadConfig::default(),
        );

        let report = builder
            .build(&BuildRequest::new(bbox, 0, &output).with_name("empty"))
            .unwrap();

        assert_eq!(report.tiles_requested, 0);
        assert_eq!(report.stats.tiles_stored, 0);
        assert!(is_complete(&output).unwrap());
    }

    #[test]
    fn test_world_from_zoom_zero_is_rejected() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("world.mbtiles");
        let source = Arc::new(MockTileSource::new());
        let builder = PyramidBuilder::new(
            source.clone(),
            TileGrid::default(),
            DownloadConfig::default(),
        );

        let plan = builder.plan(&BoundingBox::world(), 0).unwrap();
        assert!(matches!(
            builder.check_plan(&plan),
            Err(BuildError::InvalidRequest(CoordError::TooManyTiles { .. }))
        ));

        let err = builder
            .build(&BuildRequest::new(BoundingBox::world(), 0, &output))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidRequest(CoordError::TooManyTiles { requested, limit })
                if requested == plan.total_tiles() && limit == DEFAULT_MAX_TILES
        ));
        assert!(!output.exists());
        assert_eq!(source.fetch_count(), 0);
    }

    #[test]
    fn test_custom_tile_budget() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("small.mbtiles");
        let builder = builder(MockTileSource::new()).with_max_tiles(31);

        let err = builder
            .build(&BuildRequest::new(dubai(), 19, &output))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidRequest(CoordError::TooManyTiles { requested: 32, limit: 31 })
        ));

        let builder = builder.with_max_tiles(32);
        assert_eq!(
            builder
                .build(&BuildRequest::new(dubai(), 19, &output))
                .unwrap()
                .stats
                .tiles_stored,
            32
        );
    }

    #[test]
    fn test_zoom_past_grid_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = builder(MockTileSource::new())
            .build(&BuildRequest::new(dubai(), 20, dir.path().join("x.mbtiles")))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidRequest(_)));
        assert!(!dir.path().join("x.mbtiles").exists());
    }
}
