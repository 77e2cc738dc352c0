//! Waveform presets.
//!
//! Every preset is a stateless function from `(amplitude curve, placement, playback
//! fraction)` to filled shapes. Nothing here reads previously drawn frames, so frames
//! can be rendered in any order and still be identical.

use kurbo::{Affine, Arc, BezPath, Circle, Point, Rect, Shape, Vec2};
use smallvec::SmallVec;

use crate::audio::amplitude::AmplitudeCurve;
use crate::style::WaveformKind;

/// One filled piece of a waveform, in canvas pixels.
pub(crate) struct WaveShape {
    /// Filled outline (nonzero winding).
    pub path: BezPath,
    /// Opacity multiplier on the waveform color.
    pub alpha: f32,
}

/// Placement of the waveform on the canvas.
pub(crate) struct WaveformParams {
    /// Center in canvas pixels.
    pub center: Point,
    /// Base radius in canvas pixels (layout scale already applied).
    pub radius: f64,
    /// Canvas pixels per design pixel, including layout scale. Scales line widths and
    /// dot sizes so presets look the same at preview and export resolutions.
    pub px: f64,
    /// Playback position as a fraction of the clip, `0..=1`.
    pub fraction: f64,
}

/// Opacity of elements past the playback position.
const INACTIVE_ALPHA: f32 = 0.25;
const FLATNESS: f64 = 0.1;

pub(crate) fn shapes_for(
    kind: WaveformKind,
    curve: &AmplitudeCurve,
    p: &WaveformParams,
) -> SmallVec<[WaveShape; 32]> {
    match kind {
        WaveformKind::Bars => bars(curve, p),
        WaveformKind::Dots => dots(curve, p),
        WaveformKind::Ring => ring(curve, p),
        WaveformKind::Linear => linear(curve, p),
        WaveformKind::Waves => waves(curve, p),
        WaveformKind::Equalizer => equalizer(curve, p),
        WaveformKind::PulseRings => pulse_rings(curve, p),
        WaveformKind::Starburst => starburst(curve, p),
        WaveformKind::Orb => orb(curve, p),
        WaveformKind::Minimal => minimal(curve, p),
    }
}

/// Element count for ring-mapped presets. Matches the amplitude bucket count so each
/// element reads its own bucket; an empty curve still draws the flat geometry.
fn element_count(curve: &AmplitudeCurve) -> usize {
    if curve.is_empty() {
        AmplitudeCurve::DEFAULT_BUCKETS
    } else {
        curve.len()
    }
}

fn bucket(curve: &AmplitudeCurve, i: usize, n: usize) -> f64 {
    f64::from(curve.value_at((i as f64 + 0.5) / n as f64))
}

fn sector_alpha(i: usize, n: usize, fraction: f64) -> f32 {
    if (i as f64) < fraction * n as f64 {
        1.0
    } else {
        INACTIVE_ALPHA
    }
}

fn angle_of(i: usize, n: usize) -> f64 {
    (i as f64 / n as f64) * std::f64::consts::TAU - std::f64::consts::FRAC_PI_2
}

/// Rectangle centered at `center`, rotated by `angle`.
fn rotated_rect(center: Point, width: f64, height: f64, angle: f64) -> BezPath {
    let mut path = Rect::from_center_size(Point::ORIGIN, (width, height)).to_path(FLATNESS);
    path.apply_affine(Affine::translate(center.to_vec2()) * Affine::rotate(angle));
    path
}

/// Ring between `inner` and `outer` radius: outer circle plus a reversed inner subpath,
/// leaving a hole under nonzero winding.
fn annulus(center: Point, outer: f64, inner: f64) -> BezPath {
    let mut path = Circle::new(center, outer).to_path(FLATNESS);
    if inner > 0.0 && inner < outer {
        let reversed = Arc::new(
            center,
            Vec2::new(inner, inner),
            0.0,
            -std::f64::consts::TAU,
            0.0,
        );
        path.extend(reversed.path_elements(FLATNESS));
        path.close_path();
    }
    path
}

/// Radial bars around the circle, growing outward with their bucket.
fn bars(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let n = element_count(curve);
    let mut out = SmallVec::new();
    for i in 0..n {
        let v = bucket(curve, i, n);
        let angle = angle_of(i, n);
        let len = p.radius * (0.15 + 0.55 * v);
        let mid = p.center + Vec2::from_angle(angle) * (p.radius + len / 2.0);
        out.push(WaveShape {
            path: rotated_rect(mid, len, 6.0 * p.px, angle),
            alpha: sector_alpha(i, n, p.fraction),
        });
    }
    out
}

/// Dots on the circle, swelling with their bucket.
fn dots(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let n = element_count(curve);
    let mut out = SmallVec::new();
    for i in 0..n {
        let v = bucket(curve, i, n);
        let at = p.center + Vec2::from_angle(angle_of(i, n)) * p.radius;
        out.push(WaveShape {
            path: Circle::new(at, (2.0 + 6.0 * v) * p.px).to_path(FLATNESS),
            alpha: sector_alpha(i, n, p.fraction),
        });
    }
    out
}

/// A single ring breathing with the current bucket.
fn ring(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let v = f64::from(curve.value_at(p.fraction));
    let outer = p.radius * (1.0 + 0.3 * v);
    let mut out = SmallVec::new();
    out.push(WaveShape {
        path: annulus(p.center, outer, outer - 10.0 * p.px),
        alpha: 1.0,
    });
    out
}

/// Horizontal bar row through the center, bars extending both up and down.
fn linear(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let n = element_count(curve);
    let span = 2.0 * p.radius;
    let slot = span / n as f64;
    let mut out = SmallVec::new();
    for i in 0..n {
        let v = bucket(curve, i, n);
        let x = p.center.x - p.radius + slot * (i as f64 + 0.5);
        let h = (p.radius * 0.8 * (0.1 + 0.9 * v)).max(2.0 * p.px);
        out.push(WaveShape {
            path: Rect::from_center_size((x, p.center.y), (slot * 0.6, h)).to_path(FLATNESS),
            alpha: sector_alpha(i, n, p.fraction),
        });
    }
    out
}

/// Closed organic blob through one point per bucket.
fn waves(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let n = element_count(curve);
    let mut path = BezPath::new();
    for i in 0..n {
        let v = bucket(curve, i, n);
        let r = p.radius * (0.75 + 0.35 * v);
        let at = p.center + Vec2::from_angle(angle_of(i, n)) * r;
        if i == 0 {
            path.move_to(at);
        } else {
            path.line_to(at);
        }
    }
    path.close_path();
    let mut out = SmallVec::new();
    out.push(WaveShape { path, alpha: 0.55 });
    out
}

/// Bars rising from a shared baseline below the center.
fn equalizer(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let n = element_count(curve);
    let span = 2.0 * p.radius;
    let slot = span / n as f64;
    let baseline = p.center.y + p.radius * 0.5;
    let mut out = SmallVec::new();
    for i in 0..n {
        let v = bucket(curve, i, n);
        let x0 = p.center.x - p.radius + slot * (i as f64 + 0.2);
        let h = (p.radius * (0.15 + 0.85 * v)).max(2.0 * p.px);
        out.push(WaveShape {
            path: Rect::new(x0, baseline - h, x0 + slot * 0.6, baseline).to_path(FLATNESS),
            alpha: sector_alpha(i, n, p.fraction),
        });
    }
    out
}

/// Three concentric rings expanding with the current bucket.
fn pulse_rings(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let v = f64::from(curve.value_at(p.fraction));
    let mut out = SmallVec::new();
    for (k, alpha) in [(0u32, 0.9f32), (1, 0.6), (2, 0.35)] {
        let r = p.radius * (0.5 + 0.25 * f64::from(k) + 0.2 * v);
        out.push(WaveShape {
            path: annulus(p.center, r, r - 4.0 * p.px),
            alpha,
        });
    }
    out
}

/// Thin spikes radiating outward.
fn starburst(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let n = element_count(curve);
    let mut out = SmallVec::new();
    for i in 0..n {
        let v = bucket(curve, i, n);
        let angle = angle_of(i, n);
        let dir = Vec2::from_angle(angle);
        let side = Vec2::from_angle(angle + std::f64::consts::FRAC_PI_2);
        let base = p.center + dir * (p.radius * 0.35);
        let tip = p.center + dir * (p.radius * (0.5 + 0.5 * v));
        let half = 2.0 * p.px;

        let mut path = BezPath::new();
        path.move_to(base + side * half);
        path.line_to(tip);
        path.line_to(base - side * half);
        path.close_path();
        out.push(WaveShape {
            path,
            alpha: sector_alpha(i, n, p.fraction),
        });
    }
    out
}

/// Solid pulsing disc with a faint halo.
fn orb(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let v = f64::from(curve.value_at(p.fraction));
    let core = p.radius * (0.55 + 0.35 * v);
    let mut out = SmallVec::new();
    out.push(WaveShape {
        path: annulus(p.center, core * 1.15 + 6.0 * p.px, core * 1.15),
        alpha: 0.25,
    });
    out.push(WaveShape {
        path: Circle::new(p.center, core).to_path(FLATNESS),
        alpha: 0.85,
    });
    out
}

/// A thin line through the center and a pulsing dot.
fn minimal(curve: &AmplitudeCurve, p: &WaveformParams) -> SmallVec<[WaveShape; 32]> {
    let v = f64::from(curve.value_at(p.fraction));
    let mut out = SmallVec::new();
    out.push(WaveShape {
        path: Rect::from_center_size(p.center, (2.0 * p.radius, 2.0 * p.px)).to_path(FLATNESS),
        alpha: 0.5,
    });
    out.push(WaveShape {
        path: Circle::new(p.center, (3.0 + 8.0 * v) * p.px).to_path(FLATNESS),
        alpha: 1.0,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [WaveformKind; 10] = [
        WaveformKind::Bars,
        WaveformKind::Dots,
        WaveformKind::Ring,
        WaveformKind::Linear,
        WaveformKind::Waves,
        WaveformKind::Equalizer,
        WaveformKind::PulseRings,
        WaveformKind::Starburst,
        WaveformKind::Orb,
        WaveformKind::Minimal,
    ];

    fn params(fraction: f64) -> WaveformParams {
        WaveformParams {
            center: Point::new(960.0, 475.0),
            radius: 220.0,
            px: 1.0,
            fraction,
        }
    }

    #[test]
    fn every_preset_draws_without_an_amplitude_curve() {
        let empty = AmplitudeCurve::default();
        for kind in ALL_KINDS {
            let shapes = shapes_for(kind, &empty, &params(0.0));
            assert!(!shapes.is_empty(), "{kind:?} drew nothing");
            for s in &shapes {
                assert!(!s.path.elements().is_empty(), "{kind:?} produced empty path");
            }
        }
    }

    #[test]
    fn played_sector_splits_active_and_inactive_bars() {
        let curve = AmplitudeCurve::from_values(vec![0.5; 30]);
        let shapes = bars(&curve, &params(0.5));
        assert_eq!(shapes.len(), 30);
        let active = shapes.iter().filter(|s| s.alpha == 1.0).count();
        let inactive = shapes.iter().filter(|s| s.alpha == INACTIVE_ALPHA).count();
        assert_eq!(active, 15);
        assert_eq!(inactive, 15);

        let all_active = bars(&curve, &params(1.0));
        assert!(all_active.iter().all(|s| s.alpha == 1.0));
    }

    #[test]
    fn louder_buckets_grow_their_bars() {
        let quiet = AmplitudeCurve::from_values(vec![0.0; 30]);
        let loud = AmplitudeCurve::from_values(vec![1.0; 30]);
        let p = params(1.0);

        let quiet_bb = bars(&quiet, &p)[0].path.bounding_box();
        let loud_bb = bars(&loud, &p)[0].path.bounding_box();
        let diag = |bb: kurbo::Rect| (bb.width().powi(2) + bb.height().powi(2)).sqrt();
        assert!(diag(loud_bb) > diag(quiet_bb));
    }

    #[test]
    fn orb_swells_with_the_current_bucket() {
        let mut values = vec![0.0; 30];
        values[29] = 1.0;
        let curve = AmplitudeCurve::from_values(values);

        let at_quiet = orb(&curve, &params(0.0));
        let at_loud = orb(&curve, &params(1.0));
        let core_quiet = at_quiet[1].path.bounding_box();
        let core_loud = at_loud[1].path.bounding_box();
        assert!(core_loud.width() > core_quiet.width());
    }

    #[test]
    fn annulus_spans_the_outer_diameter() {
        let path = annulus(Point::new(0.0, 0.0), 100.0, 90.0);
        let bb = path.bounding_box();
        assert!((bb.width() - 200.0).abs() < 1.0);
        assert!((bb.height() - 200.0).abs() < 1.0);
    }
}
