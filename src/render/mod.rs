//! Frame rendering.
//!
//! [`Compositor`] turns a prepared project snapshot plus a point in time into one
//! premultiplied RGBA8 frame. The same inputs and time always produce the same bytes,
//! which is what lets preview and export share a renderer and lets export run frames
//! in parallel.

pub(crate) mod blur;
mod compositor;
pub(crate) mod text;
pub(crate) mod waveform;

pub use compositor::Compositor;

use crate::assets::PreparedImage;
use crate::audio::amplitude::AmplitudeCurve;
use crate::captions::CaptionTrack;
use crate::layout::LayoutConfig;
use crate::style::StyleConfig;

/// Everything a frame needs besides the time: the prepared, immutable project snapshot.
///
/// Built once per loaded project (see `Project::prepare`) and shared read-only between
/// the preview loop and export workers.
#[derive(Clone, Debug)]
pub struct RenderInputs {
    /// Style snapshot.
    pub style: StyleConfig,
    /// Element placement.
    pub layout: LayoutConfig,
    /// Timed caption segments.
    pub captions: CaptionTrack,
    /// Loudness profile of the audio.
    pub amplitude: AmplitudeCurve,
    /// Decoded logo, if configured and loadable.
    pub logo: Option<PreparedImage>,
    /// Background image, already cover-scaled to the canvas and pre-blurred.
    pub background: Option<PreparedImage>,
    /// Clip length in seconds.
    pub duration: f64,
}

impl RenderInputs {
    /// Playback fraction for `time`, clamped into `0..=1`. Zero-length clips pin to 0.
    pub fn fraction_at(&self, time: f64) -> f64 {
        if self.duration > 0.0 && time.is_finite() {
            (time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_clamps_and_handles_zero_duration() {
        let mut inputs = RenderInputs {
            style: StyleConfig::default(),
            layout: LayoutConfig::default(),
            captions: CaptionTrack::default(),
            amplitude: AmplitudeCurve::default(),
            logo: None,
            background: None,
            duration: 10.0,
        };
        assert_eq!(inputs.fraction_at(5.0), 0.5);
        assert_eq!(inputs.fraction_at(-1.0), 0.0);
        assert_eq!(inputs.fraction_at(25.0), 1.0);
        assert_eq!(inputs.fraction_at(f64::NAN), 0.0);

        inputs.duration = 0.0;
        assert_eq!(inputs.fraction_at(5.0), 0.0);
    }
}
