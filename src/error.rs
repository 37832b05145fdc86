//! Error types for the export pipeline.

use thiserror::Error;

/// Errors that abort an export call.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No graphics tree could be located from the caller-supplied handle.
    #[error("no graphics tree found at the given handle")]
    MissingSource,
    /// Input SVG text could not be parsed.
    #[error("failed to parse SVG: {0}")]
    Parse(#[from] roxmltree::Error),
    /// The composed document did not serialize into well-formed SVG.
    #[error("failed to serialize document: {0}")]
    Serialization(String),
    /// The finished document still references a network resource.
    #[error("document still references external resource {0}")]
    ExternalReference(String),
    /// The download primitive rejected the document.
    #[error("failed to deliver document: {0}")]
    Download(String),
    /// The finished document could not be rasterized.
    #[error("failed to rasterize document: {0}")]
    Raster(String),
    /// Filesystem failure while delivering or rasterizing.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reasons an image could not be embedded. Never fatal to an export.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The image bytes could not be fetched.
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// Requested location
        url: String,
        /// Underlying cause
        reason: String,
    },
    /// The bytes were fetched but are not a decodable raster image.
    #[error("failed to decode image: {0}")]
    Decode(String),
    /// The decoded raster could not be re-encoded.
    #[error("failed to encode image: {0}")]
    Encode(String),
    /// The location uses a scheme this embedder cannot load.
    #[error("unsupported image location: {0}")]
    Unsupported(String),
    /// The platform image pipeline reported an error.
    #[error("platform error: {0}")]
    Platform(String),
}
