//! PNG rendering of finished documents (native builds only).

use crate::error::ExportError;
use std::sync::Arc;
use tiny_skia::Pixmap;

/// Smallest accepted output scale.
pub const MIN_SCALE: f32 = 0.25;
/// Largest accepted output scale.
pub const MAX_SCALE: f32 = 8.0;

/// Font database with every system font loaded.
pub fn system_fonts() -> Arc<fontdb::Database> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    log::debug!("loaded {} font faces", db.len());
    Arc::new(db)
}

/// Renders a standalone SVG document to PNG bytes.
///
/// `scale` is clamped to `MIN_SCALE..=MAX_SCALE`. The document's own background is kept;
/// uncovered pixels stay transparent.
pub fn render_png(svg: &str, scale: f32, fonts: Arc<fontdb::Database>) -> Result<Vec<u8>, ExportError> {
    let mut opt = usvg::Options::default();
    opt.fontdb = fonts;
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opt).map_err(|e| ExportError::Raster(e.to_string()))?;

    let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    let size = tree.size();
    let out_w = (size.width() * scale).round().max(1.0) as u32;
    let out_h = (size.height() * scale).round().max(1.0) as u32;
    let mut pixmap = Pixmap::new(out_w, out_h)
        .ok_or_else(|| ExportError::Raster(format!("failed to create pixmap {}x{}", out_w, out_h)))?;

    let transform = tiny_skia::Transform::from_scale(scale, scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|e| ExportError::Raster(e.to_string()))
}
