//! tilepyramid - MBTiles pyramids from XYZ tile servers
//!
//! Enumerates every Web-Mercator tile covering a bounding box from a
//! requested zoom down to the grid's deepest level, fetches them
//! concurrently and stores them in a single-writer MBTiles file.
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilepyramid::build::{BuildRequest, PyramidBuilder};
//! use tilepyramid::config::DownloadConfig;
//! use tilepyramid::coord::{BoundingBox, TileGrid};
//! use tilepyramid::provider::{ReqwestClient, TemplateTileSource, UrlTemplate};
//!
//! let template = UrlTemplate::parse("http://c.tile.openstreetmap.org/{z}/{x}/{y}.png")?;
//! let source = TemplateTileSource::new(ReqwestClient::new()?, template);
//! let builder = PyramidBuilder::new(Arc::new(source), TileGrid::default(), DownloadConfig::default());
//!
//! let bbox = BoundingBox::new(55.397945, 25.291090, 55.402741, 25.292889)?;
//! let report = builder.build(&BuildRequest::new(bbox, 19, "dubai.mbtiles"))?;
//! println!("{} tiles", report.stats.tiles_stored);
//! ```

pub mod build;
pub mod config;
pub mod coord;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod store;
pub mod tile;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
