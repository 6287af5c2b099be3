//! Provider types and traits

use thiserror::Error;

use crate::coord::TileId;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },
    /// Server answered 2xx with no body
    #[error("Empty response from {url}")]
    EmptyResponse { url: String },
    /// URL template could not be parsed
    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),
}

impl ProviderError {
    /// Whether retrying the same request might succeed.
    ///
    /// Client errors (4xx) are permanent, except 408 Request Timeout and
    /// 429 Too Many Requests. Everything else is treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::HttpError(_) => true,
            ProviderError::HttpStatus { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            ProviderError::EmptyResponse { .. } => true,
            ProviderError::InvalidTemplate(_) => false,
        }
    }
}

/// Source of encoded tile images.
///
/// Implementors retrieve the payload for one `(zoom, col, row)` slot. Calls
/// may block; the fetcher pool runs them on dedicated worker threads.
pub trait TileSource: Send + Sync {
    /// Retrieves the encoded image for `tile`.
    fn fetch(&self, tile: TileId) -> Result<Vec<u8>, ProviderError>;

    /// Returns the source's name for logging and metadata.
    fn name(&self) -> &str;
}

impl<T: TileSource + ?Sized> TileSource for std::sync::Arc<T> {
    fn fetch(&self, tile: TileId) -> Result<Vec<u8>, ProviderError> {
        (**self).fetch(tile)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
