use super::{locate_graphics_tree, Exporter, FooterLegend};
use crate::download::DownloadSink;
use crate::embed::ImageEmbedder;
use crate::error::ExportError;
use crate::text_metrics::TextMeasurer;
use crate::tree::GraphicsNode;
use crate::types::{ExportOptions, ExportedDocument};

impl<M: TextMeasurer, E: ImageEmbedder, S: DownloadSink> Exporter<M, E, S> {
    /// Exports the first chart found under `container` and hands it to the download sink.
    ///
    /// Returns `false` when nothing was delivered; the reason is logged.
    pub async fn export_chart(&self, container: Option<&GraphicsNode>, filename: &str, options: &ExportOptions) -> bool {
        log::debug!("exporting chart as {}", filename);
        let result = self.build_chart_document(container, filename, options).await;
        self.deliver(result).await
    }

    /// Builds the standalone document for a chart without delivering it.
    ///
    /// Discrete legend items are packed into rows below the chart; a built-in legend in the
    /// chart's lower half is replaced and its band reused.
    pub async fn build_chart_document(
        &self,
        container: Option<&GraphicsNode>,
        filename: &str,
        options: &ExportOptions,
    ) -> Result<ExportedDocument, ExportError> {
        let live = locate_graphics_tree(container).ok_or(ExportError::MissingSource)?;
        self.compose(
            live,
            filename,
            options,
            Some(FooterLegend::Items(&options.legend_items)),
            |_| {},
            |_| None,
        )
        .await
    }
}
