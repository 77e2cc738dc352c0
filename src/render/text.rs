//! Text shaping via Parley.
//!
//! Families named in the style ("system-ui", "Inter", ...) are resolved against the
//! host's font database, and the winning face's bytes are registered with Parley so
//! shaping and glyph drawing always agree on the same font file. Resolved faces are
//! cached per engine; layouts themselves are rebuilt every frame.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::style::Color;

/// Straight RGBA8 brush carried through Parley layouts and read back per glyph run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Color> for TextBrushRgba8 {
    fn from(c: Color) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// One styled layout request.
pub(crate) struct LineSpec<'a> {
    pub text: &'a str,
    pub family: &'a str,
    pub size_px: f32,
    pub weight: u16,
    pub brush: TextBrushRgba8,
    /// Wrap width in pixels; `None` keeps everything on one line.
    pub max_width: Option<f32>,
}

/// A face picked for a `(family, weight)` pair, ready for both shaping and drawing.
pub(crate) struct ResolvedFont {
    /// Family name as registered with Parley.
    family: String,
    /// The same face handed to the raster backend.
    pub(crate) cpu_font: vello_cpu::peniko::FontData,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    weight: u16,
}

/// Stateful helper for building Parley layouts from host fonts.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    db: usvg::fontdb::Database,
    resolved: HashMap<FontKey, Arc<ResolvedFont>>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct an engine backed by the host's installed fonts.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            db,
            resolved: HashMap::new(),
        }
    }

    /// Whether any face is available at all. Headless hosts can be fontless; callers
    /// treat text as absent rather than failing the frame.
    pub fn has_fonts(&self) -> bool {
        self.db.faces().next().is_some()
    }

    /// Shape `spec.text`, wrapping at `spec.max_width` when set. `spans` override the
    /// default brush over byte ranges of the text (karaoke word highlighting).
    pub fn layout_line(
        &mut self,
        spec: &LineSpec<'_>,
        spans: &[(Range<usize>, TextBrushRgba8)],
    ) -> AudiogramResult<(parley::Layout<TextBrushRgba8>, Arc<ResolvedFont>)> {
        if !spec.size_px.is_finite() || spec.size_px <= 0.0 {
            return Err(AudiogramError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let font = self.resolve(spec.family, spec.weight)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, spec.text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(font.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(spec.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(spec.weight)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(spec.brush));
        for (range, brush) in spans {
            builder.push(parley::style::StyleProperty::Brush(*brush), range.clone());
        }

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(spec.text);
        if let Some(w) = spec.max_width {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok((layout, font))
    }

    /// Pick a face for `(family, weight)` from the host database, register its bytes
    /// with Parley, and wrap the same bytes for the raster backend.
    fn resolve(&mut self, family: &str, weight: u16) -> AudiogramResult<Arc<ResolvedFont>> {
        let key = FontKey {
            family: family.to_owned(),
            weight,
        };
        if let Some(f) = self.resolved.get(&key) {
            return Ok(Arc::clone(f));
        }

        let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
        match family.trim().to_ascii_lowercase().as_str() {
            "" | "system-ui" | "sans-serif" => {}
            "serif" => families.push(usvg::fontdb::Family::Serif),
            "monospace" => families.push(usvg::fontdb::Family::Monospace),
            "cursive" => families.push(usvg::fontdb::Family::Cursive),
            "fantasy" => families.push(usvg::fontdb::Family::Fantasy),
            _ => families.push(usvg::fontdb::Family::Name(family)),
        }
        families.push(usvg::fontdb::Family::SansSerif);
        families.push(usvg::fontdb::Family::Serif);
        families.push(usvg::fontdb::Family::Monospace);

        let query = usvg::fontdb::Query {
            families: &families,
            weight: usvg::fontdb::Weight(weight),
            stretch: usvg::fontdb::Stretch::Normal,
            style: usvg::fontdb::Style::Normal,
        };
        let id = self
            .db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|f| f.id))
            .ok_or_else(|| {
                AudiogramError::media(format!("no usable font face for family '{family}'"))
            })?;

        let (bytes, face_index) = self
            .db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| AudiogramError::media("failed to read font face data"))?;

        let registered = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = registered.first().map(|(id, _)| *id).ok_or_else(|| {
            AudiogramError::media("no font families registered from font bytes")
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| AudiogramError::media("registered font family has no name"))?
            .to_string();

        let cpu_font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes),
            face_index,
        );

        let font = Arc::new(ResolvedFont {
            family: family_name,
            cpu_font,
        });
        self.resolved.insert(key, Arc::clone(&font));
        Ok(font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_sizes() {
        let mut engine = TextLayoutEngine::new();
        let spec = LineSpec {
            text: "hi",
            family: "system-ui",
            size_px: 0.0,
            weight: 400,
            brush: TextBrushRgba8::default(),
            max_width: None,
        };
        assert!(engine.layout_line(&spec, &[]).is_err());
    }

    #[test]
    fn shapes_a_single_line_with_host_fonts() {
        let mut engine = TextLayoutEngine::new();
        if !engine.has_fonts() {
            return;
        }
        let spec = LineSpec {
            text: "Hello audiogram",
            family: "system-ui",
            size_px: 32.0,
            weight: 400,
            brush: TextBrushRgba8 {
                r: 255,
                g: 255,
                b: 255,
                a: 255,
            },
            max_width: None,
        };
        let (layout, _font) = engine.layout_line(&spec, &[]).unwrap();
        assert_eq!(layout.lines().count(), 1);
        assert!(layout.width() > 0.0);
        assert!(layout.height() > 0.0);
    }

    #[test]
    fn span_brushes_override_the_default() {
        let mut engine = TextLayoutEngine::new();
        if !engine.has_fonts() {
            return;
        }
        let white = TextBrushRgba8 {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        };
        let accent = TextBrushRgba8 {
            r: 0,
            g: 255,
            b: 0,
            a: 255,
        };
        let text = "one two";
        let spec = LineSpec {
            text,
            family: "system-ui",
            size_px: 24.0,
            weight: 400,
            brush: white,
            max_width: None,
        };
        let (layout, _font) = engine.layout_line(&spec, &[(4..7, accent)]).unwrap();

        let mut seen = std::collections::HashSet::new();
        for line in layout.lines() {
            for item in line.items() {
                if let parley::layout::PositionedLayoutItem::GlyphRun(run) = item {
                    seen.insert(run.style().brush);
                }
            }
        }
        assert!(seen.contains(&white));
        assert!(seen.contains(&accent));
    }

    #[test]
    fn wrap_width_breaks_long_text_into_lines() {
        let mut engine = TextLayoutEngine::new();
        if !engine.has_fonts() {
            return;
        }
        let spec = LineSpec {
            text: "a reasonably long caption that cannot fit on one narrow line",
            family: "system-ui",
            size_px: 24.0,
            weight: 400,
            brush: TextBrushRgba8::default(),
            max_width: Some(120.0),
        };
        let (layout, _font) = engine.layout_line(&spec, &[]).unwrap();
        assert!(layout.lines().count() > 1);
        assert!(layout.width() <= 121.0);
    }

    #[test]
    fn resolved_faces_are_cached_per_family_and_weight() {
        let mut engine = TextLayoutEngine::new();
        if !engine.has_fonts() {
            return;
        }
        let spec = LineSpec {
            text: "x",
            family: "system-ui",
            size_px: 16.0,
            weight: 700,
            brush: TextBrushRgba8::default(),
            max_width: None,
        };
        engine.layout_line(&spec, &[]).unwrap();
        engine.layout_line(&spec, &[]).unwrap();
        assert_eq!(engine.resolved.len(), 1);
    }
}
