//! # Chart Snapshot
//!
//! Turns a live, styled chart (a graphics tree whose look partly comes from a theme) into a
//! single self-contained SVG document:
//! - resolved styles are copied inline so the file renders the same anywhere
//! - a header with title and wrapped description is added above the chart
//! - a footer with a packed legend (or a gradient legend for maps) and a logo is added below
//! - external images are embedded as data URIs or dropped
//!
//! The caller supplies three collaborators through [`Exporter`]: a [`TextMeasurer`] for layout,
//! an [`ImageEmbedder`] for the logo, and a [`DownloadSink`] for the finished file.
//!
//! ```no_run
//! use chart_snapshot::{CollectingSink, ExportOptions, Exporter, GraphicsNode, OfflineEmbedder, AverageCharMeasurer};
//!
//! let chart = GraphicsNode::parse(r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300"/>"#)?;
//! let exporter = Exporter::new(AverageCharMeasurer::default(), OfflineEmbedder, CollectingSink::new());
//! let options = ExportOptions { title: Some("Impact by decile".into()), ..Default::default() };
//! let delivered = futures::executor::block_on(exporter.export_chart(Some(&chart), "impact", &options));
//! assert!(delivered);
//! # Ok::<(), chart_snapshot::ExportError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bounds;
pub mod constants;
pub mod download;
pub mod embed;
mod error;
pub mod export;
pub mod inline;
pub mod legend;
#[cfg(not(target_arch = "wasm32"))]
pub mod raster;
pub mod sanitize;
pub mod text_metrics;
pub mod theme;
pub mod tree;
mod types;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use download::{CollectingSink, DownloadSink};
pub use embed::{ImageEmbedder, OfflineEmbedder};
pub use error::{EmbedError, ExportError};
pub use export::{DocumentLayout, ExportConfig, Exporter};
pub use text_metrics::{AverageCharMeasurer, TextMeasurer};
pub use tree::GraphicsNode;
pub use types::*;
