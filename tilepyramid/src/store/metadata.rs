//! MBTiles `metadata` table contents.

use crate::coord::{BoundingBox, ZoomRange};
use crate::tile::TileFormat;

/// Descriptive attributes of a finished pyramid.
///
/// Written as `name`/`value` rows once every tile is stored. A file without
/// these rows is the marker of an incomplete run.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub format: Option<TileFormat>,
    pub bounds: BoundingBox,
    pub zooms: ZoomRange,
    pub description: Option<String>,
    pub attribution: Option<String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, bounds: BoundingBox, zooms: ZoomRange) -> Self {
        Self {
            name: name.into(),
            format: None,
            bounds,
            zooms,
            description: None,
            attribution: None,
        }
    }

    pub fn with_format(mut self, format: Option<TileFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    /// `lon,lat,zoom` with the zoom at the shallow end of the range.
    pub fn center(&self) -> String {
        let (lon, lat) = self.bounds.center();
        format!("{},{},{}", lon, lat, self.zooms.min())
    }

    /// Rows to insert, in a stable order.
    pub fn to_rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("name", self.name.clone()),
            ("type", "baselayer".to_string()),
            ("version", "1.0".to_string()),
            ("bounds", self.bounds.to_string()),
            ("center", self.center()),
            ("minzoom", self.zooms.min().to_string()),
            ("maxzoom", self.zooms.max().to_string()),
        ];
        if let Some(format) = self.format {
            rows.push(("format", format.as_str().to_string()));
        }
        if let Some(ref description) = self.description {
            rows.push(("description", description.clone()));
        }
        if let Some(ref attribution) = self.attribution {
            rows.push(("attribution", attribution.clone()));
        }
        rows
    }
}
