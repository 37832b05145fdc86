//! Image embedding: turn an externally hosted raster into a self-contained data URI.
//!
//! Loading is the only suspension point of an export. Failures surface as [`EmbedError`]
//! and the orchestrator treats them as "no logo", never as a failed export.

use crate::error::EmbedError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// Loads an image and returns it as a `data:` URI.
#[allow(async_fn_in_trait)]
pub trait ImageEmbedder {
    /// Resolves `url` to a self-contained representation.
    async fn embed(&self, url: &str) -> Result<String, EmbedError>;
}

impl<T: ImageEmbedder + ?Sized> ImageEmbedder for &T {
    async fn embed(&self, url: &str) -> Result<String, EmbedError> {
        (**self).embed(url).await
    }
}

/// Whether the reference is already self-contained.
pub fn is_data_uri(url: &str) -> bool {
    url.trim_start()
        .get(..5)
        .map(|p| p.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

/// Whether the reference points at a network resource.
pub fn is_network_url(url: &str) -> bool {
    let u = url.trim_start().to_ascii_lowercase();
    u.starts_with("http://") || u.starts_with("https://") || u.starts_with("//")
}

/// Base64 `data:` URI for the given bytes.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes))
}

/// Embedder for exports that must not perform any I/O: only `data:` URIs resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEmbedder;

impl ImageEmbedder for OfflineEmbedder {
    async fn embed(&self, url: &str) -> Result<String, EmbedError> {
        if is_data_uri(url) {
            Ok(url.to_string())
        } else {
            Err(EmbedError::Unsupported(url.to_string()))
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{reencode_png, RasterEmbedder, DEFAULT_FETCH_TIMEOUT};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::{encode_data_uri, is_data_uri, is_network_url, ImageEmbedder};
    use crate::error::EmbedError;
    use crate::sanitize::sanitize_svg;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Default upper bound on a single image request.
    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

    /// Fetches over HTTP(S) or from disk and re-encodes through an off-screen raster surface.
    #[derive(Debug, Clone)]
    pub struct RasterEmbedder {
        client: reqwest::Client,
    }

    impl RasterEmbedder {
        /// Creates an embedder with [`DEFAULT_FETCH_TIMEOUT`].
        pub fn new() -> Result<Self, EmbedError> {
            Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
        }

        /// Creates an embedder whose requests give up after `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self, EmbedError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| EmbedError::Platform(e.to_string()))?;
            Ok(Self { client })
        }

        async fn fetch(&self, url: &str) -> Result<Vec<u8>, EmbedError> {
            let fetch_err = |reason: String| EmbedError::Fetch {
                url: url.to_string(),
                reason,
            };
            if is_network_url(url) {
                let url = if url.starts_with("//") {
                    format!("https:{}", url)
                } else {
                    url.to_string()
                };
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| fetch_err(e.to_string()))?;
                let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
                return Ok(bytes.to_vec());
            }
            let path = match url.strip_prefix("file://") {
                Some(p) => PathBuf::from(p),
                None if !url.contains("://") => PathBuf::from(url),
                None => return Err(EmbedError::Unsupported(url.to_string())),
            };
            std::fs::read(&path).map_err(|e| fetch_err(e.to_string()))
        }
    }

    impl ImageEmbedder for RasterEmbedder {
        async fn embed(&self, url: &str) -> Result<String, EmbedError> {
            if is_data_uri(url) {
                return Ok(url.to_string());
            }
            let bytes = self.fetch(url).await?;
            if looks_like_svg(&bytes) {
                // vector logos stay vector, minus anything that would load from elsewhere
                let clean = sanitize_svg(&String::from_utf8_lossy(&bytes))
                    .map_err(|e| EmbedError::Decode(e.to_string()))?;
                return Ok(encode_data_uri("image/svg+xml", clean.as_bytes()));
            }
            let png = reencode_png(&bytes)?;
            log::debug!("embedded {} ({} bytes as PNG)", url, png.len());
            Ok(encode_data_uri("image/png", &png))
        }
    }

    fn looks_like_svg(bytes: &[u8]) -> bool {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
        let head = head.trim_start();
        head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
    }

    /// Decodes any supported raster format, draws it onto a pixmap of its natural size and
    /// encodes that surface as PNG.
    pub fn reencode_png(bytes: &[u8]) -> Result<Vec<u8>, EmbedError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| EmbedError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        let size = tiny_skia::IntSize::from_wh(width, height)
            .ok_or_else(|| EmbedError::Decode(format!("invalid image size {}x{}", width, height)))?;

        // tiny-skia stores premultiplied alpha
        let mut data = image.into_raw();
        for px in data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * a + 127) / 255) as u8;
            }
        }
        let pixmap = tiny_skia::Pixmap::from_vec(data, size)
            .ok_or_else(|| EmbedError::Encode("pixmap allocation failed".to_string()))?;
        pixmap.encode_png().map_err(|e| EmbedError::Encode(e.to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::CanvasEmbedder;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{is_data_uri, ImageEmbedder};
    use crate::error::EmbedError;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;

    /// Loads through an `<img>` element and re-encodes via an off-screen canvas.
    ///
    /// There is no timeout: a load that never settles keeps the export waiting.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct CanvasEmbedder;

    fn platform(e: wasm_bindgen::JsValue) -> EmbedError {
        EmbedError::Platform(format!("{:?}", e))
    }

    impl ImageEmbedder for CanvasEmbedder {
        async fn embed(&self, url: &str) -> Result<String, EmbedError> {
            if is_data_uri(url) {
                return Ok(url.to_string());
            }
            let window = web_sys::window().ok_or_else(|| EmbedError::Platform("No window found".into()))?;
            let document = window
                .document()
                .ok_or_else(|| EmbedError::Platform("No document found".into()))?;

            let img = web_sys::HtmlImageElement::new().map_err(platform)?;
            img.set_cross_origin(Some("anonymous"));

            let (sender, receiver) = futures::channel::oneshot::channel::<Result<(), String>>();
            let sender = Rc::new(RefCell::new(Some(sender)));

            let onload = {
                let sender = sender.clone();
                Closure::wrap(Box::new(move |_event: web_sys::Event| {
                    if let Some(tx) = sender.borrow_mut().take() {
                        let _ = tx.send(Ok(()));
                    }
                }) as Box<dyn FnMut(_)>)
            };
            let onerror = {
                let sender = sender.clone();
                Closure::wrap(Box::new(move |event: web_sys::Event| {
                    if let Some(tx) = sender.borrow_mut().take() {
                        let _ = tx.send(Err(format!("image failed to load ({})", event.type_())));
                    }
                }) as Box<dyn FnMut(_)>)
            };
            img.set_onload(Some(onload.as_ref().unchecked_ref()));
            img.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            img.set_src(url);

            let loaded = receiver
                .await
                .map_err(|_| EmbedError::Platform("image load abandoned".into()))?;
            img.set_onload(None);
            img.set_onerror(None);
            drop(onload);
            drop(onerror);
            loaded.map_err(|reason| EmbedError::Fetch {
                url: url.to_string(),
                reason,
            })?;

            let canvas = document
                .create_element("canvas")
                .map_err(platform)?
                .dyn_into::<web_sys::HtmlCanvasElement>()
                .map_err(|_| EmbedError::Platform("Failed to cast to canvas element".into()))?;
            canvas.set_width(img.natural_width());
            canvas.set_height(img.natural_height());
            let ctx = canvas
                .get_context("2d")
                .map_err(platform)?
                .ok_or_else(|| EmbedError::Platform("2d context unavailable".into()))?
                .dyn_into::<web_sys::CanvasRenderingContext2d>()
                .map_err(|_| EmbedError::Platform("Failed to cast 2d context".into()))?;
            ctx.draw_image_with_html_image_element(&img, 0.0, 0.0)
                .map_err(platform)?;
            // a tainted canvas (CORS) throws here
            canvas.to_data_url_with_type("image/png").map_err(platform)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn url_classification() {
        assert!(is_data_uri("data:image/png;base64,AAAA"));
        assert!(is_data_uri("  DATA:image/png;base64,AAAA"));
        assert!(!is_data_uri("https://example.org/logo.png"));
        assert!(is_network_url("https://example.org/logo.png"));
        assert!(is_network_url("HTTP://example.org/logo.png"));
        assert!(is_network_url("//cdn.example.org/logo.png"));
        assert!(!is_network_url("logo.png"));
        assert!(!is_network_url("#gradient"));
    }

    #[test]
    fn data_uri_encoding() {
        assert_eq!(encode_data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn offline_embedder_only_passes_data_uris() {
        let uri = "data:image/png;base64,YWJj";
        assert_eq!(block_on(OfflineEmbedder.embed(uri)).unwrap(), uri);
        assert!(matches!(
            block_on(OfflineEmbedder.embed("https://example.org/logo.png")),
            Err(EmbedError::Unsupported(_))
        ));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn raster_round_trip_through_pixmap() {
        let mut source = image::RgbaImage::new(3, 2);
        source.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        let mut encoded = Vec::new();
        image::DynamicImage::ImageRgba8(source)
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .unwrap();

        let png = reencode_png(&encoded).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(reencode_png(b"not an image"), Err(EmbedError::Decode(_))));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn svg_logo_is_embedded_without_network_references() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.svg");
        std::fs::write(
            &path,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="80" height="24">
  <style>@import url(https://fonts.example.org/brand.css);</style>
  <image href="https://cdn.example.org/mark.png" width="24" height="24"/>
  <script>fetch("https://tracker.example.org")</script>
  <text x="28" y="18">Brand</text>
</svg>"#,
        )
        .unwrap();

        let embedder = RasterEmbedder::new().unwrap();
        let uri = block_on(embedder.embed(path.to_str().unwrap())).unwrap();
        let payload = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(BASE64_STANDARD.decode(payload).unwrap()).unwrap();
        assert!(!svg.contains("https://"), "{}", svg);
        assert!(!svg.contains("<script"));
        assert!(svg.contains("Brand"));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn missing_file_is_a_fetch_error() {
        let embedder = RasterEmbedder::new().unwrap();
        let result = block_on(embedder.embed("/definitely/not/here/logo.png"));
        assert!(matches!(result, Err(EmbedError::Fetch { .. })));
    }
}
