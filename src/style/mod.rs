//! Style snapshot consumed by the compositor.
//!
//! The document mirrors what the branding editor emits: hex color strings, pixel font sizes on
//! the 1920x1080 reference canvas, 0-100 percentages for opacity-like values, camelCase field
//! names. Every field has a default so a partial (or empty) JSON object decodes to the stock
//! look; [`StyleConfig::validate`] then applies the explicit range checks.

mod color;

pub use color::Color;

use crate::foundation::error::{AudiogramError, AudiogramResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete per-render style snapshot. Immutable once handed to a render.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    /// Title text drawn at the title layout slot.
    pub podcast_name: String,
    /// Whether the title is drawn (and hit-testable) at all.
    pub title_visible: bool,
    /// Title typography.
    pub title: TitleStyle,
    /// Optional logo image (PNG/JPEG/WebP/SVG path).
    pub logo: Option<PathBuf>,
    /// Caption typography and karaoke coloring.
    pub caption: CaptionStyle,
    /// Waveform preset and color.
    pub waveform: WaveformStyle,
    /// Background color/image/blur/overlay.
    pub background: BackgroundStyle,
    /// Accent color: progress-bar fill and the fallback for waveform and caption highlight.
    pub primary_color: Color,
    /// Whether the progress bar is drawn.
    pub progress_bar_visible: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            podcast_name: String::new(),
            title_visible: true,
            title: TitleStyle::default(),
            logo: None,
            caption: CaptionStyle::default(),
            waveform: WaveformStyle::default(),
            background: BackgroundStyle::default(),
            primary_color: Color::from_rgb8(0x63, 0x66, 0xf1),
            progress_bar_visible: true,
        }
    }
}

/// Title typography.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleStyle {
    /// Fill color.
    pub color: Color,
    /// Size in reference-canvas pixels.
    pub font_size: f64,
    /// CSS-style weight (400/600/700 in the editor).
    pub font_weight: u16,
}

impl Default for TitleStyle {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            font_size: 64.0,
            font_weight: 700,
        }
    }
}

/// Caption typography and karaoke word coloring.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptionStyle {
    /// Font family stack, CSS-style ("system-ui", "Georgia, serif", ...).
    pub font: String,
    /// Size in reference-canvas pixels.
    pub font_size: f64,
    /// CSS-style weight.
    pub font_weight: u16,
    /// Base word color.
    pub color: Color,
    /// Current-word color when not decorated; falls back to the primary color.
    pub highlight_color: Option<Color>,
    /// Outline width in pixels (0 disables the outline pass).
    pub stroke_width: f64,
    /// Outline color.
    pub stroke_color: Color,
    /// Uppercase every word before shaping.
    pub uppercase: bool,
    /// Decorated mode: the current word keeps the full base color while the rest of the
    /// segment dims to `decoration_opacity` percent.
    pub decorated: bool,
    /// Dim level for non-current words in decorated mode, 0-100 percent.
    pub decoration_opacity: f64,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: "system-ui".to_owned(),
            font_size: 42.0,
            font_weight: 400,
            color: Color::WHITE,
            highlight_color: None,
            stroke_width: 0.0,
            stroke_color: Color::BLACK,
            uppercase: false,
            decorated: false,
            decoration_opacity: 30.0,
        }
    }
}

impl CaptionStyle {
    /// Resolved current-word color: highlight, else the accent.
    pub fn resolved_highlight(&self, primary: Color) -> Color {
        self.highlight_color.unwrap_or(primary)
    }
}

/// Waveform preset and color.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveformStyle {
    /// Which preset to draw.
    pub kind: WaveformKind,
    /// Fill color; falls back to the primary color.
    pub color: Option<Color>,
}

impl WaveformStyle {
    /// Resolved waveform color: explicit, else the accent.
    pub fn resolved_color(&self, primary: Color) -> Color {
        self.color.unwrap_or(primary)
    }
}

/// Closed set of waveform presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaveformKind {
    /// Radial bars around the circle, amplitude-driven length.
    #[default]
    Bars,
    /// Dots on a ring, amplitude-driven radius.
    Dots,
    /// Thin tick marks crossing a ring.
    Ring,
    /// Horizontal bar chart centered on the waveform anchor.
    Linear,
    /// Mirrored filled wave band.
    Waves,
    /// Baseline-anchored bar chart.
    Equalizer,
    /// Concentric rings pulsing with the instantaneous amplitude.
    PulseRings,
    /// Radial spikes.
    Starburst,
    /// Single pulsing disc with a halo.
    Orb,
    /// Sparse tick marks along a horizontal line.
    Minimal,
}

/// Background color/image/blur/overlay.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundStyle {
    /// Base fill color.
    pub color: Color,
    /// Optional image, cover-scaled and center-cropped onto the canvas.
    pub image: Option<PathBuf>,
    /// Gaussian blur sigma in pixels applied to the background image; `None` disables.
    pub blur: Option<f64>,
    /// Black dim overlay strength, 0-100 percent; `None` disables.
    pub overlay: Option<f64>,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            color: Color::from_rgb8(0x0a, 0x0a, 0x0a),
            image: None,
            blur: None,
            overlay: None,
        }
    }
}

impl StyleConfig {
    /// Check numeric ranges the editor guarantees. Decoding stays permissive; this is the
    /// explicit gate renders and exports go through.
    pub fn validate(&self) -> AudiogramResult<()> {
        check_font_size("title", self.title.font_size)?;
        check_font_weight("title", self.title.font_weight)?;
        check_font_size("caption", self.caption.font_size)?;
        check_font_weight("caption", self.caption.font_weight)?;

        if !self.caption.stroke_width.is_finite()
            || self.caption.stroke_width < 0.0
            || self.caption.stroke_width > 8.0
        {
            return Err(AudiogramError::validation(
                "caption strokeWidth must be in 0..=8",
            ));
        }
        if !self.caption.decoration_opacity.is_finite()
            || !(0.0..=100.0).contains(&self.caption.decoration_opacity)
        {
            return Err(AudiogramError::validation(
                "caption decorationOpacity must be in 0..=100",
            ));
        }
        if let Some(blur) = self.background.blur
            && (!blur.is_finite() || blur < 0.0)
        {
            return Err(AudiogramError::validation(
                "background blur must be finite and >= 0",
            ));
        }
        if let Some(overlay) = self.background.overlay
            && (!overlay.is_finite() || !(0.0..=100.0).contains(&overlay))
        {
            return Err(AudiogramError::validation(
                "background overlay must be in 0..=100",
            ));
        }
        Ok(())
    }
}

fn check_font_size(what: &str, size: f64) -> AudiogramResult<()> {
    if !size.is_finite() || size <= 0.0 {
        return Err(AudiogramError::validation(format!(
            "{what} fontSize must be finite and > 0"
        )));
    }
    Ok(())
}

fn check_font_weight(what: &str, weight: u16) -> AudiogramResult<()> {
    if !(100..=1000).contains(&weight) {
        return Err(AudiogramError::validation(format!(
            "{what} fontWeight must be in 100..=1000"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_decodes_to_stock_look() {
        let s: StyleConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(s.primary_color, Color::from_rgb8(0x63, 0x66, 0xf1));
        assert_eq!(s.background.color, Color::from_rgb8(0x0a, 0x0a, 0x0a));
        assert_eq!(s.title.font_size, 64.0);
        assert_eq!(s.title.font_weight, 700);
        assert_eq!(s.caption.font, "system-ui");
        assert_eq!(s.caption.font_size, 42.0);
        assert_eq!(s.waveform.kind, WaveformKind::Bars);
        assert!(s.title_visible);
        assert!(s.progress_bar_visible);
        assert!(s.logo.is_none());
        assert!(s.background.image.is_none());
        s.validate().unwrap();
    }

    #[test]
    fn camel_case_fields_and_preset_names_decode() {
        let s: StyleConfig = serde_json::from_str(
            r##"{
                "podcastName": "Night Owls",
                "titleVisible": false,
                "primaryColor": "#ff0055",
                "progressBarVisible": false,
                "waveform": { "kind": "pulseRings", "color": "#00ff00" },
                "caption": { "highlightColor": "#ffcc00", "strokeWidth": 2, "uppercase": true },
                "background": { "image": "bg.png", "blur": 12, "overlay": 55 }
            }"##,
        )
        .unwrap();
        assert_eq!(s.podcast_name, "Night Owls");
        assert!(!s.title_visible);
        assert!(!s.progress_bar_visible);
        assert_eq!(s.waveform.kind, WaveformKind::PulseRings);
        assert_eq!(s.caption.highlight_color, Some(Color::from_rgb8(0xff, 0xcc, 0)));
        assert_eq!(s.background.blur, Some(12.0));
        assert_eq!(s.background.overlay, Some(55.0));
        s.validate().unwrap();
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut s = StyleConfig::default();
        s.caption.stroke_width = 9.0;
        assert!(s.validate().is_err());

        let mut s = StyleConfig::default();
        s.caption.decoration_opacity = 130.0;
        assert!(s.validate().is_err());

        let mut s = StyleConfig::default();
        s.title.font_weight = 50;
        assert!(s.validate().is_err());

        let mut s = StyleConfig::default();
        s.background.overlay = Some(101.0);
        assert!(s.validate().is_err());

        let mut s = StyleConfig::default();
        s.background.blur = Some(f64::NAN);
        assert!(s.validate().is_err());
    }

    #[test]
    fn fallback_colors_resolve_to_primary() {
        let s = StyleConfig::default();
        assert_eq!(
            s.waveform.resolved_color(s.primary_color),
            s.primary_color
        );
        assert_eq!(
            s.caption.resolved_highlight(s.primary_color),
            s.primary_color
        );
        let mut s = StyleConfig::default();
        s.waveform.color = Some(Color::WHITE);
        assert_eq!(s.waveform.resolved_color(s.primary_color), Color::WHITE);
    }
}
