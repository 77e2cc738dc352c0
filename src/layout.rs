//! Element layout: normalized positions, footprint clamping, and pointer hit-testing.
//!
//! All coordinates are fractions of the canvas (`0.0..=1.0` on each axis), so the same
//! layout drives the interactive preview and the full-resolution export. Pixel-sized
//! elements (logo box, waveform radius) convert through the reference canvas.

use serde::{Deserialize, Serialize};

use crate::foundation::core::Canvas;
use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Logo box edge in reference-canvas pixels at unit scale.
pub const LOGO_BOX_PX: f64 = 120.0;
/// Waveform base radius in reference-canvas pixels at unit scale.
pub const WAVEFORM_RADIUS_PX: f64 = 220.0;

/// Title hit band: horizontal extent in canvas fractions.
const TITLE_HIT_WIDTH: f64 = 0.35;
/// Title hit band: vertical half-height in canvas fractions.
const TITLE_HIT_HALF_HEIGHT: f64 = 0.04;
/// Subtitle hit band half-height in canvas fractions.
const SUBTITLE_HIT_HALF_HEIGHT: f64 = 0.06;
/// Progress-bar hit band half-height in canvas fractions.
const PROGRESS_HIT_HALF_HEIGHT: f64 = 0.02;

const LOGO_SCALE_RANGE: (f64, f64) = (0.25, 2.0);
const WAVEFORM_SCALE_RANGE: (f64, f64) = (0.5, 2.0);

/// Logo position (top-left corner) and scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogoLayout {
    /// Left edge as a fraction of canvas width.
    pub x: f64,
    /// Top edge as a fraction of canvas height.
    pub y: f64,
    /// Multiplier on the base logo box.
    pub scale: f64,
}

impl Default for LogoLayout {
    fn default() -> Self {
        Self {
            x: 0.05,
            y: 0.08,
            scale: 1.0,
        }
    }
}

impl LogoLayout {
    /// Footprint of the logo box in canvas fractions, `(width, height)`.
    pub fn extent(&self) -> (f64, f64) {
        let px = LOGO_BOX_PX * self.scale;
        (
            px / f64::from(Canvas::HD.width),
            px / f64::from(Canvas::HD.height),
        )
    }
}

/// Title anchor (left edge of the text line).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleLayout {
    /// Left edge as a fraction of canvas width.
    pub x: f64,
    /// Baseline band center as a fraction of canvas height.
    pub y: f64,
}

impl Default for TitleLayout {
    fn default() -> Self {
        Self { x: 0.325, y: 0.18 }
    }
}

/// Waveform center and scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveformLayout {
    /// Center as a fraction of canvas width.
    pub center_x: f64,
    /// Center as a fraction of canvas height.
    pub center_y: f64,
    /// Multiplier on the base radius.
    pub scale: f64,
}

impl Default for WaveformLayout {
    fn default() -> Self {
        Self {
            center_x: 0.5,
            center_y: 0.44,
            scale: 1.0,
        }
    }
}

/// Subtitle (caption) line anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubtitleLayout {
    /// Line center as a fraction of canvas height.
    pub center_y: f64,
}

impl Default for SubtitleLayout {
    fn default() -> Self {
        Self { center_y: 0.77 }
    }
}

/// Progress bar anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressBarLayout {
    /// Bar center as a fraction of canvas height.
    pub y: f64,
}

impl Default for ProgressBarLayout {
    fn default() -> Self {
        Self { y: 0.92 }
    }
}

/// One draggable element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HitTarget {
    /// The logo box.
    Logo,
    /// The podcast title line.
    Title,
    /// The waveform visualization.
    Waveform,
    /// The caption line.
    Subtitle,
    /// The progress bar.
    ProgressBar,
}

/// Normalized positions of every positionable element.
///
/// Mutated only through [`LayoutConfig::move_target`], which keeps each element's
/// footprint inside the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Logo placement.
    pub logo: LogoLayout,
    /// Title placement.
    pub title: TitleLayout,
    /// Waveform placement.
    pub waveform: WaveformLayout,
    /// Caption placement.
    pub subtitle: SubtitleLayout,
    /// Progress bar placement.
    pub progress_bar: ProgressBarLayout,
}

impl LayoutConfig {
    /// Check that every coordinate is finite and inside `[0, 1]` and that scales sit in
    /// their allowed ranges.
    pub fn validate(&self) -> AudiogramResult<()> {
        let coords = [
            ("logo.x", self.logo.x),
            ("logo.y", self.logo.y),
            ("title.x", self.title.x),
            ("title.y", self.title.y),
            ("waveform.centerX", self.waveform.center_x),
            ("waveform.centerY", self.waveform.center_y),
            ("subtitle.centerY", self.subtitle.center_y),
            ("progressBar.y", self.progress_bar.y),
        ];
        for (name, v) in coords {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(AudiogramError::validation(format!(
                    "layout {name} must be in 0..=1"
                )));
            }
        }
        check_scale("logo.scale", self.logo.scale, LOGO_SCALE_RANGE)?;
        check_scale("waveform.scale", self.waveform.scale, WAVEFORM_SCALE_RANGE)?;
        Ok(())
    }

    /// Re-apply every per-target clamp. Used after loading a document so persisted
    /// layouts satisfy the same footprint invariant drags maintain.
    pub fn clamp_footprints(&mut self) {
        let logo = (self.logo.x, self.logo.y);
        self.move_target(HitTarget::Logo, logo.0, logo.1);
        let title = (self.title.x, self.title.y);
        self.move_target(HitTarget::Title, title.0, title.1);
        let wave = (self.waveform.center_x, self.waveform.center_y);
        self.move_target(HitTarget::Waveform, wave.0, wave.1);
        let sub_y = self.subtitle.center_y;
        self.move_target(HitTarget::Subtitle, 0.0, sub_y);
        let bar_y = self.progress_bar.y;
        self.move_target(HitTarget::ProgressBar, 0.0, bar_y);
    }

    /// Find which element sits under the pointer at `(nx, ny)` (canvas fractions).
    ///
    /// Overlaps resolve by fixed priority: logo, then title, then waveform, then
    /// subtitle, then progress bar. Elements that are not drawn are skipped.
    pub fn hit_test(
        &self,
        nx: f64,
        ny: f64,
        has_logo: bool,
        title_visible: bool,
    ) -> Option<HitTarget> {
        if has_logo {
            let (w, h) = self.logo.extent();
            if nx >= self.logo.x
                && nx <= self.logo.x + w
                && ny >= self.logo.y
                && ny <= self.logo.y + h
            {
                return Some(HitTarget::Logo);
            }
        }
        if title_visible
            && nx >= self.title.x
            && nx <= self.title.x + TITLE_HIT_WIDTH
            && (ny - self.title.y).abs() <= TITLE_HIT_HALF_HEIGHT
        {
            return Some(HitTarget::Title);
        }
        {
            let rx = WAVEFORM_RADIUS_PX * self.waveform.scale / f64::from(Canvas::HD.width);
            let ry = WAVEFORM_RADIUS_PX * self.waveform.scale / f64::from(Canvas::HD.height);
            let dx = (nx - self.waveform.center_x) / rx;
            let dy = (ny - self.waveform.center_y) / ry;
            if dx * dx + dy * dy <= 1.0 {
                return Some(HitTarget::Waveform);
            }
        }
        if (ny - self.subtitle.center_y).abs() <= SUBTITLE_HIT_HALF_HEIGHT {
            return Some(HitTarget::Subtitle);
        }
        if (ny - self.progress_bar.y).abs() <= PROGRESS_HIT_HALF_HEIGHT {
            return Some(HitTarget::ProgressBar);
        }
        None
    }

    /// Move `target`'s anchor to `(nx, ny)`, clamped so the element stays on canvas.
    ///
    /// The logo clamps its whole box; the other targets clamp their anchor point.
    /// Vertical-only targets ignore `nx`.
    pub fn move_target(&mut self, target: HitTarget, nx: f64, ny: f64) {
        match target {
            HitTarget::Logo => {
                let (w, h) = self.logo.extent();
                self.logo.x = clamp01(nx).min((1.0 - w).max(0.0));
                self.logo.y = clamp01(ny).min((1.0 - h).max(0.0));
            }
            HitTarget::Title => {
                self.title.x = clamp01(nx);
                self.title.y = clamp01(ny);
            }
            HitTarget::Waveform => {
                self.waveform.center_x = clamp01(nx);
                self.waveform.center_y = clamp01(ny);
            }
            HitTarget::Subtitle => {
                self.subtitle.center_y = clamp01(ny);
            }
            HitTarget::ProgressBar => {
                self.progress_bar.y = clamp01(ny);
            }
        }
    }
}

fn clamp01(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

fn check_scale(name: &str, v: f64, (lo, hi): (f64, f64)) -> AudiogramResult<()> {
    if !v.is_finite() || v < lo || v > hi {
        return Err(AudiogramError::validation(format!(
            "layout {name} must be in {lo}..={hi}"
        )));
    }
    Ok(())
}
