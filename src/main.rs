#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use chart_snapshot::download::{DirectorySink, DownloadSink, SaveDialogSink};
    use chart_snapshot::embed::RasterEmbedder;
    use chart_snapshot::text_metrics::FontDbMeasurer;
    use chart_snapshot::theme::{mount, Theme};
    use chart_snapshot::{
        raster, ExportConfig, ExportError, ExportOptions, ExportedDocument, Exporter, GraphicsNode, MapExportOptions,
    };
    use clap::Parser;
    use std::error::Error;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Export a chart SVG as a standalone document with title, description, legend and logo.
    #[derive(Parser, Debug)]
    #[command(version, about, long_about = None)]
    pub struct Args {
        /// Chart (or map) SVG to export
        pub input: PathBuf,

        /// Export options as JSON
        #[arg(long)]
        pub options: Option<PathBuf>,

        /// Layout configuration as JSON
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Extra theme stylesheets applied before the document's own <style> blocks
        #[arg(long)]
        pub css: Vec<PathBuf>,

        /// Output directory
        #[arg(long, short, default_value = ".")]
        pub out_dir: PathBuf,

        /// Pick the SVG's location in a save dialog instead of writing into --out-dir
        #[arg(long, default_value_t = false)]
        pub save_dialog: bool,

        /// Output filename, defaults to the input's file stem
        #[arg(long)]
        pub filename: Option<String>,

        /// Treat the input as a map (gradient legend, zoom reset, region card)
        #[arg(long, default_value_t = false)]
        pub map: bool,

        /// Also write a PNG rendering next to the SVG
        #[arg(long, default_value_t = false)]
        pub png: bool,

        /// PNG scale factor
        #[arg(long, default_value_t = 2.0)]
        pub scale: f32,
    }

    /// Where the finished SVG goes.
    enum Destination {
        Directory(DirectorySink),
        Dialog(SaveDialogSink),
    }

    impl DownloadSink for Destination {
        async fn deliver(&self, doc: &ExportedDocument) -> Result<(), ExportError> {
            match self {
                Destination::Directory(sink) => sink.deliver(doc).await,
                Destination::Dialog(sink) => sink.deliver(doc).await,
            }
        }
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(path: Option<&PathBuf>) -> Result<T, Box<dyn Error>> {
        match path {
            Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
            None => Ok(T::default()),
        }
    }

    pub async fn run(args: Args) -> Result<(), Box<dyn Error>> {
        let mut theme = Theme::default();
        for path in &args.css {
            theme.extend(Theme::parse_css(&std::fs::read_to_string(path)?));
        }
        let mut chart = GraphicsNode::parse(&std::fs::read_to_string(&args.input)?)?;
        theme.extend(Theme::from_embedded_styles(&chart));
        mount(&mut chart, &theme);

        let config: ExportConfig = read_json(args.config.as_ref())?;
        let filename = match &args.filename {
            Some(name) => name.clone(),
            None => args
                .input
                .file_stem()
                .map(|s| format!("{}-export", s.to_string_lossy()))
                .unwrap_or_else(|| "chart-export".to_string()),
        };

        let measurer = FontDbMeasurer::with_system_fonts();
        let fonts = Arc::new(measurer.database().clone());
        let directory = DirectorySink::new(&args.out_dir);
        let sink = if args.save_dialog {
            Destination::Dialog(SaveDialogSink)
        } else {
            Destination::Directory(directory.clone())
        };
        let exporter = Exporter::new(measurer, RasterEmbedder::new()?, sink).with_config(config);

        let doc = if args.map {
            let options: MapExportOptions = read_json(args.options.as_ref())?;
            exporter.build_map_document(Some(&chart), &filename, &options).await?
        } else {
            let options: ExportOptions = read_json(args.options.as_ref())?;
            exporter.build_chart_document(Some(&chart), &filename, &options).await?
        };
        exporter.sink().deliver(&doc).await?;
        log::info!("exported {} ({}x{})", doc.filename, doc.width, doc.height);

        if args.png {
            let png = raster::render_png(&doc.contents, args.scale, fonts)?;
            // the rendering always lands in --out-dir, even when the SVG went through the dialog
            let path = directory.path_for(&doc).with_extension("png");
            std::fs::write(&path, png)?;
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn directory_is_the_default_destination() {
            let args = Args::try_parse_from(["chart-snapshot", "chart.svg"]).unwrap();
            assert!(!args.save_dialog);
            assert_eq!(args.out_dir, PathBuf::from("."));
            assert_eq!(args.scale, 2.0);
        }

        #[test]
        fn save_dialog_flag_parses() {
            let args = Args::try_parse_from(["chart-snapshot", "map.svg", "--map", "--save-dialog", "--png"]).unwrap();
            assert!(args.save_dialog && args.map && args.png);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> std::process::ExitCode {
    use clap::Parser;

    env_logger::init();

    let args = cli::Args::parse();
    match cli::run(args).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("export failed: {}", e);
            eprintln!("error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
