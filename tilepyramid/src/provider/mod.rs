//! Tile source abstraction
//!
//! This module provides the [`TileSource`] trait the fetcher pool calls to
//! retrieve one encoded tile image, plus the default implementation that
//! renders an XYZ URL template and downloads it over HTTP.
//!
//! ```ignore
//! use tilepyramid::provider::{ReqwestClient, TemplateTileSource, UrlTemplate};
//!
//! let client = ReqwestClient::with_timeout(30)?;
//! let template = UrlTemplate::parse("https://tile.example.org/{z}/{x}/{y}.png")?;
//! let source = TemplateTileSource::new(client, template);
//! ```

mod http;
mod template;
mod types;

pub use http::{default_user_agent, HttpClient, ReqwestClient, DEFAULT_HTTP_TIMEOUT_SECS};
pub use template::{TemplateTileSource, UrlTemplate, DEFAULT_SUBDOMAINS, DEFAULT_URL_TEMPLATE};
pub use types::{ProviderError, TileSource};

#[cfg(test)]
pub use http::tests::MockHttpClient;
