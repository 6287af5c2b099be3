//! Fetched tile payloads.

use std::fmt;

use image::ImageFormat;

use crate::coord::TileId;

/// A tile slot together with its encoded image bytes.
///
/// Produced by a fetcher worker, consumed exactly once by the store writer.
#[derive(Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub data: Vec<u8>,
}

impl Tile {
    pub fn new(id: TileId, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("id", &self.id)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Image encoding of a tile payload, as recorded in MBTiles metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Png,
    Jpeg,
    Webp,
}

impl TileFormat {
    /// Sniffs the encoding from the payload's magic bytes.
    ///
    /// Only the header is inspected; nothing is decoded.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            ImageFormat::Png => Some(TileFormat::Png),
            ImageFormat::Jpeg => Some(TileFormat::Jpeg),
            ImageFormat::WebP => Some(TileFormat::Webp),
            _ => None,
        }
    }

    /// Value for the MBTiles `format` metadata key.
    pub fn as_str(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpg",
            TileFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
