//! Delivery of finished documents.
//!
//! In the browser this is the classic blob + hidden anchor download; natively the document is
//! written to a directory or to a path picked in a save dialog.

use crate::error::ExportError;
use crate::types::ExportedDocument;
use std::cell::RefCell;

/// Hands a finished document to the user.
#[allow(async_fn_in_trait)]
pub trait DownloadSink {
    /// Delivers the document under its suggested filename.
    async fn deliver(&self, doc: &ExportedDocument) -> Result<(), ExportError>;
}

impl<T: DownloadSink + ?Sized> DownloadSink for &T {
    async fn deliver(&self, doc: &ExportedDocument) -> Result<(), ExportError> {
        (**self).deliver(doc).await
    }
}

/// Keeps delivered documents in memory, for callers that post-process the artifact.
#[derive(Debug, Default)]
pub struct CollectingSink {
    documents: RefCell<Vec<ExportedDocument>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents delivered so far.
    pub fn len(&self) -> usize {
        self.documents.borrow().len()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.documents.borrow().is_empty()
    }

    /// Takes every delivered document out of the sink.
    pub fn take(&self) -> Vec<ExportedDocument> {
        std::mem::take(&mut *self.documents.borrow_mut())
    }
}

impl DownloadSink for CollectingSink {
    async fn deliver(&self, doc: &ExportedDocument) -> Result<(), ExportError> {
        self.documents.borrow_mut().push(doc.clone());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{DirectorySink, SaveDialogSink};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::DownloadSink;
    use crate::error::ExportError;
    use crate::types::ExportedDocument;
    use std::path::{Path, PathBuf};

    /// Writes each document into a fixed directory.
    #[derive(Debug, Clone)]
    pub struct DirectorySink {
        dir: PathBuf,
    }

    impl DirectorySink {
        /// Targets `dir`, created on first delivery if missing.
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        /// Where a document will be written.
        pub fn path_for(&self, doc: &ExportedDocument) -> PathBuf {
            self.dir.join(&doc.filename)
        }

        /// Target directory.
        pub fn dir(&self) -> &Path {
            &self.dir
        }
    }

    impl DownloadSink for DirectorySink {
        async fn deliver(&self, doc: &ExportedDocument) -> Result<(), ExportError> {
            std::fs::create_dir_all(&self.dir)?;
            let path = self.path_for(doc);
            std::fs::write(&path, doc.contents.as_bytes())?;
            log::info!("wrote {}", path.display());
            Ok(())
        }
    }

    /// Asks the user where to save through the native save dialog.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SaveDialogSink;

    impl DownloadSink for SaveDialogSink {
        async fn deliver(&self, doc: &ExportedDocument) -> Result<(), ExportError> {
            let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("SVG", &["svg"])
                .set_file_name(&doc.filename)
                .save_file()
                .await
            else {
                log::info!("save dialog cancelled for {}", doc.filename);
                return Ok(());
            };
            std::fs::write(handle.path(), doc.contents.as_bytes())?;
            Ok(())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserDownload;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::DownloadSink;
    use crate::error::ExportError;
    use crate::types::ExportedDocument;

    /// Offers the document through the browser's download mechanism.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct BrowserDownload;

    impl DownloadSink for BrowserDownload {
        async fn deliver(&self, doc: &ExportedDocument) -> Result<(), ExportError> {
            trigger_download(&doc.filename, doc.mime_type(), &doc.contents).map_err(ExportError::Download)
        }
    }

    /// Creates a temporary anchor element with a blob URL, clicks it, and releases the URL.
    fn trigger_download(filename: &str, mime: &str, content: &str) -> Result<(), String> {
        use wasm_bindgen::JsCast;

        let window = web_sys::window().ok_or("No window found")?;
        let document = window.document().ok_or("No document found")?;

        let blob_parts = js_sys::Array::new();
        blob_parts.push(&wasm_bindgen::JsValue::from_str(content));

        let blob_options = web_sys::BlobPropertyBag::new();
        blob_options.set_type(mime);

        let blob = web_sys::Blob::new_with_str_sequence_and_options(&blob_parts, &blob_options)
            .map_err(|_| "Failed to create blob")?;

        let url = web_sys::Url::create_object_url_with_blob(&blob)
            .map_err(|_| "Failed to create object URL")?;

        let anchor = document
            .create_element("a")
            .map_err(|_| "Failed to create anchor element")?
            .dyn_into::<web_sys::HtmlAnchorElement>()
            .map_err(|_| "Failed to cast to anchor element")?;

        anchor.set_href(&url);
        anchor.set_download(filename);
        anchor.style().set_property("display", "none").ok();

        let body = document.body().ok_or("No body found")?;
        body.append_child(&anchor).map_err(|_| "Failed to append anchor")?;
        anchor.click();
        body.remove_child(&anchor).map_err(|_| "Failed to remove anchor")?;

        web_sys::Url::revoke_object_url(&url).map_err(|_| "Failed to revoke object URL")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn collecting_sink_keeps_documents() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());
        let doc = ExportedDocument::new("chart", "<svg/>".into(), 10.0, 10.0);
        block_on(sink.deliver(&doc)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.take()[0].filename, "chart.svg");
        assert!(sink.is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("exports"));
        let doc = ExportedDocument::new("decile-impact", "<svg/>".into(), 10.0, 10.0);
        block_on(sink.deliver(&doc)).unwrap();
        let written = std::fs::read_to_string(sink.path_for(&doc)).unwrap();
        assert_eq!(written, "<svg/>");
    }
}
