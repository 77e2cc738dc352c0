//! Frame compositor.
//!
//! Draws one complete audiogram frame with `vello_cpu`: background (color, cover image,
//! dim overlay), waveform preset, logo, title, karaoke caption, progress bar, in that
//! order. A [`Compositor`] is a stateful worker; its caches only affect speed, never
//! pixels, so any number of workers render the same frame to the same bytes.

use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{Affine, Point, Shape};

use crate::assets::PreparedImage;
use crate::foundation::core::{Canvas, FrameRGBA};
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::layout::{LOGO_BOX_PX, WAVEFORM_RADIUS_PX};
use crate::render::RenderInputs;
use crate::render::text::{LineSpec, ResolvedFont, TextBrushRgba8, TextLayoutEngine};
use crate::render::waveform::{self, WaveformParams};
use crate::style::{CaptionStyle, Color};
use crate::captions::CaptionSegment;

#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
    // Pins the source allocation so the pointer key cannot be reused while cached.
    src: Arc<Vec<u8>>,
}

/// Horizontal alignment applied per wrapped line when positioning glyphs.
enum LineAlign {
    Left,
    Center,
}

/// Stateful frame renderer. One per thread; see the module docs for the draw order.
pub struct Compositor {
    canvas: Canvas,
    ctx: Option<vello_cpu::RenderContext>,
    text_engine: TextLayoutEngine,
    image_paints: HashMap<usize, ImagePaint>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Canvas::HD)
    }
}

impl Compositor {
    /// Construct a compositor for `canvas`. Design-pixel sizes (fonts, the logo box, the
    /// waveform radius) scale with the canvas width relative to [`Canvas::HD`].
    pub fn new(canvas: Canvas) -> Self {
        let text_engine = TextLayoutEngine::new();
        if !text_engine.has_fonts() {
            tracing::warn!("no host fonts found; title and caption passes will be skipped");
        }
        Self {
            canvas,
            ctx: None,
            text_engine,
            image_paints: HashMap::new(),
        }
    }

    /// The output dimensions this compositor draws at.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Whether text passes will draw. False on fontless hosts.
    pub fn has_fonts(&self) -> bool {
        self.text_engine.has_fonts()
    }

    /// Canvas pixels per design pixel.
    fn px(&self) -> f64 {
        f64::from(self.canvas.width) / f64::from(Canvas::HD.width)
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> AudiogramResult<R>,
    ) -> AudiogramResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    /// Render the frame at `time` seconds into premultiplied RGBA8.
    pub fn render(&mut self, inputs: &RenderInputs, time: f64) -> AudiogramResult<FrameRGBA> {
        let w: u16 = self
            .canvas
            .width
            .try_into()
            .map_err(|_| AudiogramError::validation("canvas width exceeds u16"))?;
        let h: u16 = self
            .canvas
            .height
            .try_into()
            .map_err(|_| AudiogramError::validation("canvas height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(AudiogramError::validation("canvas must be non-empty"));
        }

        let fraction = inputs.fraction_at(time);
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        self.with_ctx_mut(w, h, |this, ctx| {
            ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

            this.draw_background(inputs, ctx)?;
            this.draw_waveform(inputs, fraction, ctx);
            this.draw_logo(inputs, ctx)?;
            this.draw_title(inputs, ctx)?;
            this.draw_caption(inputs, time, ctx)?;
            this.draw_progress(inputs, fraction, ctx);

            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(())
        })?;

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_background(
        &mut self,
        inputs: &RenderInputs,
        ctx: &mut vello_cpu::RenderContext,
    ) -> AudiogramResult<()> {
        let w = f64::from(self.canvas.width);
        let h = f64::from(self.canvas.height);

        let c = inputs.style.background.color;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));

        if let Some(img) = &inputs.background {
            // Already cover-cropped to a canvas at prepare time; scaling here absorbs a
            // preview canvas that differs from the one the image was prepared for.
            let p = self.image_paint_for(img)?;
            if p.w > 0 && p.h > 0 {
                ctx.set_transform(affine_to_cpu(Affine::scale_non_uniform(
                    w / f64::from(p.w),
                    h / f64::from(p.h),
                )));
                ctx.set_paint(p.paint);
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(p.w),
                    f64::from(p.h),
                ));
            }

            if let Some(pct) = inputs.style.background.overlay
                && pct > 0.0
            {
                let a = ((pct / 100.0).clamp(0.0, 1.0) * 255.0).round() as u8;
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, a));
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            }
        }
        Ok(())
    }

    fn draw_waveform(
        &self,
        inputs: &RenderInputs,
        fraction: f64,
        ctx: &mut vello_cpu::RenderContext,
    ) {
        let lay = &inputs.layout.waveform;
        let px = self.px();
        let params = WaveformParams {
            center: Point::new(
                lay.center_x * f64::from(self.canvas.width),
                lay.center_y * f64::from(self.canvas.height),
            ),
            radius: WAVEFORM_RADIUS_PX * px * lay.scale,
            px: px * lay.scale,
            fraction,
        };
        let color = inputs
            .style
            .waveform
            .resolved_color(inputs.style.primary_color);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        for shape in waveform::shapes_for(inputs.style.waveform.kind, &inputs.amplitude, &params) {
            let c = color.with_alpha_scaled(f64::from(shape.alpha));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
            ctx.fill_path(&bezpath_to_cpu(&shape.path));
        }
    }

    fn draw_logo(
        &mut self,
        inputs: &RenderInputs,
        ctx: &mut vello_cpu::RenderContext,
    ) -> AudiogramResult<()> {
        let Some(img) = &inputs.logo else {
            return Ok(());
        };
        if img.width == 0 || img.height == 0 {
            return Ok(());
        }
        let lay = &inputs.layout.logo;
        let box_px = LOGO_BOX_PX * self.px() * lay.scale;
        let s = (box_px / f64::from(img.width)).min(box_px / f64::from(img.height));
        let draw_w = f64::from(img.width) * s;
        let draw_h = f64::from(img.height) * s;
        // Aspect-fit, centered inside the logo box.
        let x = lay.x * f64::from(self.canvas.width) + (box_px - draw_w) / 2.0;
        let y = lay.y * f64::from(self.canvas.height) + (box_px - draw_h) / 2.0;

        let p = self.image_paint_for(img)?;
        ctx.set_transform(affine_to_cpu(Affine::translate((x, y)) * Affine::scale(s)));
        ctx.set_paint(p.paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(p.w),
            f64::from(p.h),
        ));
        Ok(())
    }

    fn draw_title(
        &mut self,
        inputs: &RenderInputs,
        ctx: &mut vello_cpu::RenderContext,
    ) -> AudiogramResult<()> {
        let style = &inputs.style;
        if !style.title_visible || style.podcast_name.trim().is_empty() {
            return Ok(());
        }
        if !self.text_engine.has_fonts() {
            return Ok(());
        }

        let px = self.px();
        let spec = LineSpec {
            text: style.podcast_name.trim(),
            family: &style.caption.font,
            size_px: (style.title.font_size * px) as f32,
            weight: style.title.font_weight,
            brush: TextBrushRgba8::from(style.title.color),
            max_width: None,
        };
        let (layout, font) = self.text_engine.layout_line(&spec, &[])?;

        let origin = Point::new(
            inputs.layout.title.x * f64::from(self.canvas.width),
            inputs.layout.title.y * f64::from(self.canvas.height) - f64::from(layout.height()) / 2.0,
        );
        draw_glyph_runs(ctx, &layout, &font, LineAlign::Left, None, origin);
        Ok(())
    }

    fn draw_caption(
        &mut self,
        inputs: &RenderInputs,
        time: f64,
        ctx: &mut vello_cpu::RenderContext,
    ) -> AudiogramResult<()> {
        let Some(seg) = inputs.captions.active_at(time) else {
            return Ok(());
        };
        if !self.text_engine.has_fonts() {
            return Ok(());
        }
        let style = &inputs.style.caption;
        let (text, spans) = caption_text_and_spans(seg, style, inputs.style.primary_color, time);
        if text.trim().is_empty() {
            return Ok(());
        }

        let px = self.px();
        let max_width = 0.8 * f64::from(self.canvas.width);
        let spec = LineSpec {
            text: &text,
            family: &style.font,
            size_px: (style.font_size * px) as f32,
            weight: style.font_weight,
            brush: TextBrushRgba8::from(style.color),
            max_width: Some(max_width as f32),
        };
        let (layout, font) = self.text_engine.layout_line(&spec, &spans)?;

        // The wrapped block is centered on the subtitle anchor, each line centered on the
        // canvas midline.
        let origin = Point::new(
            0.5 * f64::from(self.canvas.width),
            inputs.layout.subtitle.center_y * f64::from(self.canvas.height)
                - f64::from(layout.height()) / 2.0,
        );

        if style.stroke_width > 0.0 {
            let r = style.stroke_width * px;
            let stroke = TextBrushRgba8::from(style.stroke_color);
            for (dx, dy) in ring_offsets(r) {
                draw_glyph_runs(
                    ctx,
                    &layout,
                    &font,
                    LineAlign::Center,
                    Some(stroke),
                    Point::new(origin.x + dx, origin.y + dy),
                );
            }
        }
        draw_glyph_runs(ctx, &layout, &font, LineAlign::Center, None, origin);
        Ok(())
    }

    fn draw_progress(
        &self,
        inputs: &RenderInputs,
        fraction: f64,
        ctx: &mut vello_cpu::RenderContext,
    ) {
        if !inputs.style.progress_bar_visible {
            return;
        }
        let w = f64::from(self.canvas.width);
        let track_w = 0.8 * w;
        let track_h = 6.0 * self.px();
        let x0 = 0.1 * w;
        let y0 = inputs.layout.progress_bar.y * f64::from(self.canvas.height) - track_h / 2.0;
        let radius = track_h / 2.0;

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 64));
        fill_rounded_rect(ctx, x0, y0, x0 + track_w, y0 + track_h, radius);

        let fill_w = track_w * fraction;
        if fill_w > 0.0 {
            let c = inputs.style.primary_color;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
            fill_rounded_rect(ctx, x0, y0, x0 + fill_w, y0 + track_h, radius.min(fill_w / 2.0));
        }
    }

    fn image_paint_for(&mut self, img: &PreparedImage) -> AudiogramResult<ImagePaint> {
        let key = Arc::as_ptr(&img.rgba8_premul) as usize;
        if let Some(p) = self.image_paints.get(&key)
            && Arc::ptr_eq(&p.src, &img.rgba8_premul)
        {
            return Ok(p.clone());
        }
        let pixmap = pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?;
        let out = ImagePaint {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            w: img.width,
            h: img.height,
            src: Arc::clone(&img.rgba8_premul),
        };
        // Live inputs hold at most a logo and a background; swapping projects strands old
        // keys, so reset rather than track liveness.
        if self.image_paints.len() >= 8 {
            self.image_paints.clear();
        }
        self.image_paints.insert(key, out.clone());
        Ok(out)
    }
}

/// Build the caption text plus per-word brush spans for `time`.
///
/// Words joined by single spaces; span ranges are byte offsets into the returned string.
/// Without word timings the segment text draws in the base color. Decorated mode keeps the
/// current word at full base color and dims the rest; karaoke mode recolors the current
/// word with the highlight.
fn caption_text_and_spans(
    seg: &CaptionSegment,
    style: &CaptionStyle,
    primary: Color,
    time: f64,
) -> (String, Vec<(std::ops::Range<usize>, TextBrushRgba8)>) {
    if seg.words.is_empty() {
        let text = if style.uppercase {
            seg.text.to_uppercase()
        } else {
            seg.text.clone()
        };
        return (text, Vec::new());
    }

    let dimmed = style
        .color
        .with_alpha_scaled(style.decoration_opacity / 100.0);
    let highlight = style.resolved_highlight(primary);

    let mut text = String::new();
    let mut spans = Vec::with_capacity(seg.words.len());
    for (i, word) in seg.words.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let start = text.len();
        if style.uppercase {
            text.push_str(&word.word.to_uppercase());
        } else {
            text.push_str(&word.word);
        }
        let color = if style.decorated {
            if word.is_current(time) { style.color } else { dimmed }
        } else if word.is_current(time) {
            highlight
        } else {
            style.color
        };
        spans.push((start..text.len(), TextBrushRgba8::from(color)));
    }
    (text, spans)
}

/// Eight offsets on a circle of radius `r`, for a poor-man's text outline drawn as
/// shifted copies under the fill.
fn ring_offsets(r: f64) -> [(f64, f64); 8] {
    let d = r * std::f64::consts::FRAC_1_SQRT_2;
    [
        (r, 0.0),
        (-r, 0.0),
        (0.0, r),
        (0.0, -r),
        (d, d),
        (d, -d),
        (-d, d),
        (-d, -d),
    ]
}

fn draw_glyph_runs(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<TextBrushRgba8>,
    font: &ResolvedFont,
    align: LineAlign,
    brush_override: Option<TextBrushRgba8>,
    origin: Point,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    for line in layout.lines() {
        let dx = match align {
            LineAlign::Left => 0.0,
            LineAlign::Center => -line.metrics().advance / 2.0,
        };
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = brush_override.unwrap_or(run.style().brush);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x + dx + origin.x as f32,
                y: g.y + origin.y as f32,
            });
            ctx.glyph_run(&font.cpu_font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn fill_rounded_rect(
    ctx: &mut vello_cpu::RenderContext,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    radius: f64,
) {
    let rr = kurbo::RoundedRect::new(x0, y0, x1, y1, radius);
    let mut p = vello_cpu::kurbo::BezPath::new();
    for el in rr.path_elements(0.1) {
        p.push(el);
    }
    ctx.fill_path(&p);
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> AudiogramResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| AudiogramError::validation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| AudiogramError::validation("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(AudiogramError::validation("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}
