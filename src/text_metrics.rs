//! Text measurement and word wrapping without a layout engine.
//!
//! Every measurement in one export goes through a single [`TextMeasurer`], so "does this
//! fit?" comparisons stay self-consistent even where absolute widths drift slightly from the
//! final renderer.

use crate::types::FontSpec;

/// Measures the rendered width of a string.
pub trait TextMeasurer {
    /// Width in pixels of `text` drawn with `font`. Must be deterministic.
    fn measure_width(&self, text: &str, font: &FontSpec) -> f32;
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for &T {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f32 {
        (**self).measure_width(text, font)
    }
}

/// Glyph-table-free estimate from per-character advance ratios.
///
/// Used where no font data is available and as the fallback of [`FontDbMeasurer`].
#[derive(Debug, Clone, Copy)]
pub struct AverageCharMeasurer {
    /// Multiplier applied to bold text
    pub bold_factor: f32,
}

impl Default for AverageCharMeasurer {
    fn default() -> Self {
        Self { bold_factor: 1.06 }
    }
}

impl AverageCharMeasurer {
    fn advance_ratio(ch: char) -> f32 {
        match ch {
            'i' | 'j' | 'l' | '!' | '|' | '.' | ',' | ':' | ';' | '\'' => 0.28,
            ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.36,
            'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.86,
            '0'..='9' => 0.56,
            c if c.is_ascii_uppercase() => 0.66,
            c if c.is_ascii() => 0.52,
            // CJK and other wide scripts
            c if (c as u32) >= 0x2E80 => 1.0,
            _ => 0.56,
        }
    }
}

impl TextMeasurer for AverageCharMeasurer {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f32 {
        let em: f32 = text.chars().map(Self::advance_ratio).sum();
        let bold = if font.is_bold() { self.bold_factor } else { 1.0 };
        em * font.size * bold
    }
}

/// Greedy word wrap.
///
/// Words accumulate on the current line while the joined line still measures within
/// `max_width`; the next word otherwise starts a new line. A word wider than `max_width`
/// sits alone on its own line and is never split. Whitespace-only input yields no lines.
pub fn wrap<M: TextMeasurer + ?Sized>(measurer: &M, text: &str, max_width: f32, font: &FontSpec) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();
    for word in text.split_whitespace() {
        let test_line = if current_line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current_line, word)
        };
        if measurer.measure_width(&test_line, font) <= max_width {
            current_line = test_line;
        } else if !current_line.is_empty() {
            lines.push(std::mem::replace(&mut current_line, word.to_string()));
        } else {
            // overlong word: alone on its own line, never split
            lines.push(word.to_string());
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }
    lines
}

/// Height of `text` once wrapped: `lines × font.size × line_height_multiplier`.
pub fn estimate_height<M: TextMeasurer + ?Sized>(
    measurer: &M,
    text: &str,
    max_width: f32,
    font: &FontSpec,
    line_height_multiplier: f32,
) -> f32 {
    wrap(measurer, text, max_width, font).len() as f32 * font.size * line_height_multiplier
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::FontDbMeasurer;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::{AverageCharMeasurer, TextMeasurer};
    use crate::types::FontSpec;

    /// Measures with real glyph advances from a `fontdb` font database.
    ///
    /// Fonts that match no face in the database fall back to [`AverageCharMeasurer`]; the
    /// fallback is per font, so measurements of any one font always use the same backend.
    pub struct FontDbMeasurer {
        db: fontdb::Database,
        fallback: AverageCharMeasurer,
    }

    impl FontDbMeasurer {
        /// Wraps an existing database.
        pub fn new(db: fontdb::Database) -> Self {
            Self {
                db,
                fallback: AverageCharMeasurer::default(),
            }
        }

        /// Loads the platform's installed fonts.
        pub fn with_system_fonts() -> Self {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            log::debug!("loaded {} font faces for text measurement", db.len());
            Self::new(db)
        }

        /// Underlying database, e.g. to share with a rasterizer.
        pub fn database(&self) -> &fontdb::Database {
            &self.db
        }

        fn face_id(&self, font: &FontSpec) -> Option<fontdb::ID> {
            let families: Vec<fontdb::Family<'_>> = font
                .family
                .split(',')
                .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\''))
                .filter(|f| !f.is_empty())
                .map(|f| match f.to_ascii_lowercase().as_str() {
                    "serif" => fontdb::Family::Serif,
                    "sans-serif" | "system-ui" => fontdb::Family::SansSerif,
                    "monospace" => fontdb::Family::Monospace,
                    "cursive" => fontdb::Family::Cursive,
                    "fantasy" => fontdb::Family::Fantasy,
                    _ => fontdb::Family::Name(f),
                })
                .collect();
            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight),
                stretch: fontdb::Stretch::Normal,
                style: if font.italic {
                    fontdb::Style::Italic
                } else {
                    fontdb::Style::Normal
                },
            };
            self.db.query(&query)
        }
    }

    impl TextMeasurer for FontDbMeasurer {
        fn measure_width(&self, text: &str, font: &FontSpec) -> f32 {
            let measured = self.face_id(font).and_then(|id| {
                self.db
                    .with_face_data(id, |data, index| {
                        let face = ttf_parser::Face::parse(data, index).ok()?;
                        let upem = f32::from(face.units_per_em());
                        let units: f32 = text
                            .chars()
                            .map(|ch| {
                                face.glyph_index(ch)
                                    .and_then(|g| face.glyph_hor_advance(g))
                                    .map(f32::from)
                                    .unwrap_or(upem * 0.5)
                            })
                            .sum();
                        Some(units * font.size / upem)
                    })
                    .flatten()
            });
            measured.unwrap_or_else(|| self.fallback.measure_width(text, font))
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::CanvasMeasurer;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::TextMeasurer;
    use crate::types::FontSpec;
    use wasm_bindgen::JsCast;

    /// Measures with an off-screen 2D canvas, the browser's own glyph metrics.
    pub struct CanvasMeasurer {
        ctx: web_sys::CanvasRenderingContext2d,
    }

    impl CanvasMeasurer {
        /// Creates a detached canvas and grabs its 2D context.
        pub fn new() -> Result<Self, String> {
            let window = web_sys::window().ok_or("No window found")?;
            let document = window.document().ok_or("No document found")?;
            let canvas = document
                .create_element("canvas")
                .map_err(|_| "Failed to create canvas element")?
                .dyn_into::<web_sys::HtmlCanvasElement>()
                .map_err(|_| "Failed to cast to canvas element")?;
            let ctx = canvas
                .get_context("2d")
                .map_err(|_| "Failed to get 2d context")?
                .ok_or("2d context unavailable")?
                .dyn_into::<web_sys::CanvasRenderingContext2d>()
                .map_err(|_| "Failed to cast 2d context")?;
            Ok(Self { ctx })
        }
    }

    impl TextMeasurer for CanvasMeasurer {
        fn measure_width(&self, text: &str, font: &FontSpec) -> f32 {
            self.ctx.set_font(&font.to_css());
            self.ctx
                .measure_text(text)
                .map(|m| m.width() as f32)
                .unwrap_or(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Every character is 10px wide regardless of font.
    struct Mono;

    impl TextMeasurer for Mono {
        fn measure_width(&self, text: &str, _font: &FontSpec) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    #[test]
    fn wraps_greedily() {
        let font = FontSpec::new(13.0);
        let lines = wrap(&Mono, "aaa bbb ccc dddd", 70.0, &font);
        assert_eq!(lines, vec!["aaa bbb", "ccc", "dddd"]);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let font = FontSpec::new(13.0);
        let lines = wrap(&Mono, "a supercalifragilistic b", 50.0, &font);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn empty_text_has_no_lines_and_no_height() {
        let font = FontSpec::new(13.0);
        assert!(wrap(&Mono, "   ", 100.0, &font).is_empty());
        assert_eq!(estimate_height(&Mono, "", 100.0, &font, 1.4), 0.0);
    }

    #[test]
    fn height_is_lines_times_line_height() {
        let font = FontSpec::new(10.0);
        let h = estimate_height(&Mono, "aaa bbb ccc", 70.0, &font, 1.5);
        assert_eq!(h, 2.0 * 10.0 * 1.5);
    }

    #[test]
    fn long_description_wraps_within_bound() {
        let measurer = AverageCharMeasurer::default();
        let font = FontSpec::new(13.0);
        let description = "The two-child limit restricts the child element of Universal Credit \
            and Child Tax Credit to the first two children in a household. This chart shows the \
            estimated change in household net income by income decile when the limit is removed. \
            Figures are shown in 2026-27 prices.";
        assert!(description.len() >= 250);
        let lines = wrap(&measurer, description, 560.0, &font);
        assert!(lines.len() >= 2);
        for line in &lines {
            assert!(measurer.measure_width(line, &font) <= 560.0, "{:?} overflows", line);
        }
    }

    #[test]
    fn bold_measures_wider() {
        let m = AverageCharMeasurer::default();
        let regular = FontSpec::new(12.0);
        let bold = FontSpec::new(12.0).with_weight(700);
        assert!(m.measure_width("Legend", &bold) > m.measure_width("Legend", &regular));
    }

    proptest! {
        #[test]
        fn every_line_fits_unless_single_overlong_word(
            words in proptest::collection::vec("[a-z]{1,14}", 0..40),
            max_width in 20.0f32..400.0,
        ) {
            let m = AverageCharMeasurer::default();
            let font = FontSpec::new(13.0);
            let text = words.join(" ");
            let lines = wrap(&m, &text, max_width, &font);
            for line in &lines {
                let fits = m.measure_width(line, &font) <= max_width;
                prop_assert!(fits || !line.contains(' '));
            }
            // lossless up to whitespace normalization
            prop_assert_eq!(lines.join(" "), text);
        }

        #[test]
        fn text_that_fits_is_a_single_identical_line(words in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            let m = AverageCharMeasurer::default();
            let font = FontSpec::new(12.0);
            let text = words.join(" ");
            let width = m.measure_width(&text, &font);
            prop_assert_eq!(wrap(&m, &text, width, &font), vec![text]);
        }
    }
}
