//! XYZ URL template tile source.
//!
//! Templates use the slippy-map placeholders understood by most tile
//! servers and web map libraries:
//!
//! - `{z}` zoom level
//! - `{x}` tile column
//! - `{y}` tile row (north origin)
//! - `{s}` optional subdomain, rotated across the configured list
//!
//! # Example
//!
//! ```
//! use tilepyramid::coord::TileId;
//! use tilepyramid::provider::UrlTemplate;
//!
//! let template = UrlTemplate::parse("http://c.tile.openstreetmap.org/{z}/{x}/{y}.png").unwrap();
//! assert_eq!(
//!     template.render(TileId::new(19, 342823, 224050)),
//!     "http://c.tile.openstreetmap.org/19/342823/224050.png"
//! );
//! ```

use std::sync::OnceLock;

use regex::Regex;

use super::http::HttpClient;
use super::types::{ProviderError, TileSource};
use crate::coord::TileId;

/// Template used when none is configured.
pub const DEFAULT_URL_TEMPLATE: &str = "http://c.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Subdomains used for `{s}` when none are given.
pub const DEFAULT_SUBDOMAINS: &[&str] = &["a", "b", "c"];

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Zoom,
    Col,
    Row,
    Subdomain,
}

/// A parsed tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
    subdomains: Vec<String>,
}

impl UrlTemplate {
    /// Parses a template, requiring `{z}`, `{x}` and `{y}`.
    ///
    /// Unknown placeholders are rejected so a typo such as `{zoom}` fails
    /// up front instead of producing thousands of 404s.
    pub fn parse(template: &str) -> Result<Self, ProviderError> {
        let mut segments = Vec::new();
        let mut last = 0;
        let (mut has_z, mut has_x, mut has_y) = (false, false, false);

        for caps in placeholder_regex().captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            let segment = match &caps[1] {
                "z" => {
                    has_z = true;
                    Segment::Zoom
                }
                "x" => {
                    has_x = true;
                    Segment::Col
                }
                "y" => {
                    has_y = true;
                    Segment::Row
                }
                "s" => Segment::Subdomain,
                other => {
                    return Err(ProviderError::InvalidTemplate(format!(
                        "unknown placeholder {{{}}} in '{}'",
                        other, template
                    )))
                }
            };
            segments.push(segment);
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        let missing: Vec<&str> = [("{z}", has_z), ("{x}", has_x), ("{y}", has_y)]
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ProviderError::InvalidTemplate(format!(
                "'{}' is missing {}",
                template,
                missing.join(", ")
            )));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
            subdomains: DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replaces the subdomain list used for `{s}`.
    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Result<Self, ProviderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subdomains: Vec<String> = subdomains.into_iter().map(Into::into).collect();
        if subdomains.is_empty() {
            return Err(ProviderError::InvalidTemplate(
                "subdomain list is empty".to_string(),
            ));
        }
        self.subdomains = subdomains;
        Ok(self)
    }

    /// The template text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Builds the URL for `tile`.
    pub fn render(&self, tile: TileId) -> String {
        let mut url = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Zoom => url.push_str(&tile.zoom.to_string()),
                Segment::Col => url.push_str(&tile.col.to_string()),
                Segment::Row => url.push_str(&tile.row.to_string()),
                Segment::Subdomain => url.push_str(self.subdomain_for(tile)),
            }
        }
        url
    }

    /// Spreads neighbouring tiles across subdomains.
    fn subdomain_for(&self, tile: TileId) -> &str {
        let index = (tile.col as u64 + tile.row as u64) % self.subdomains.len() as u64;
        &self.subdomains[index as usize]
    }
}

/// Tile source that fetches `template.render(tile)` over HTTP.
pub struct TemplateTileSource<C: HttpClient> {
    http_client: C,
    template: UrlTemplate,
}

impl<C: HttpClient> TemplateTileSource<C> {
    /// Creates a source from a parsed template.
    pub fn new(http_client: C, template: UrlTemplate) -> Self {
        Self {
            http_client,
            template,
        }
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }
}

impl<C: HttpClient> TileSource for TemplateTileSource<C> {
    fn fetch(&self, tile: TileId) -> Result<Vec<u8>, ProviderError> {
        let url = self.template.render(tile);
        self.http_client.get(&url)
    }

    fn name(&self) -> &str {
        self.template.as_str()
    }
}
