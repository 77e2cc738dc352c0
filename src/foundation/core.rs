use crate::foundation::error::{AudiogramError, AudiogramResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Zero-based frame number on the fixed-fps timeline.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frame rate as an exact rational (`num / den` frames per second).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator, frames.
    pub num: u32,
    /// Denominator, seconds.
    pub den: u32,
}

impl Fps {
    /// The fixed audiogram timeline rate, 30 fps.
    pub const TIMELINE: Fps = Fps { num: 30, den: 1 };

    /// Construct a validated frame rate.
    pub fn new(num: u32, den: u32) -> AudiogramResult<Self> {
        if num == 0 || den == 0 {
            return Err(AudiogramError::validation("fps must have num>0 and den>0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Timeline time in seconds at the start of `frame`.
    pub fn frames_to_secs(self, frame: FrameIndex) -> f64 {
        (frame.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Number of frames needed to cover `secs` of timeline (`ceil(secs * fps)`).
    pub fn frames_covering(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * self.as_f64()).ceil() as u64
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self::TIMELINE
    }
}

/// Output raster dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// The reference audiogram canvas, 1920x1080.
    pub const HD: Canvas = Canvas {
        width: 1920,
        height: 1080,
    };
}

impl Default for Canvas {
    fn default() -> Self {
        Self::HD
    }
}

/// Premultiplied RGBA8 color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red, premultiplied by alpha.
    pub r: u8,
    /// Green, premultiplied by alpha.
    pub g: u8,
    /// Blue, premultiplied by alpha.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self::default()
    }

    /// Premultiply straight RGBA8 channels.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        let mul = |c: u8| -> u8 { (((c as u16) * (a as u16) + 127) / 255) as u8 };
        Self {
            r: mul(r),
            g: mul(g),
            b: mul(b),
            a,
        }
    }
}

/// A rendered frame as premultiplied RGBA8 pixels.
///
/// Frames leave the compositor premultiplied; the export path flattens them over an opaque
/// background before bytes reach the encoder. The flag makes that explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

/// Shared exclusivity flag between export and interactive playback.
///
/// Export acquires the flag for the lifetime of an attempt; while held, playback refuses to
/// start and drag sessions refuse to begin. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Create a released flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some attempt currently holds the flag.
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_time_mapping_is_exact_at_30() {
        let fps = Fps::TIMELINE;
        assert_eq!(fps.frames_to_secs(FrameIndex(150)), 5.0);
        assert_eq!(fps.frames_covering(10.0), 300);
        // Partial trailing second still gets a frame.
        assert_eq!(fps.frames_covering(10.01), 301);
        assert_eq!(fps.frames_covering(0.0), 0);
        assert_eq!(fps.frames_covering(f64::NAN), 0);
    }

    #[test]
    fn fps_rejects_zero_terms() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        assert!(Fps::new(30, 1).is_ok());
    }

    #[test]
    fn premultiply_rounds_to_nearest() {
        let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
        assert_eq!(c.r, 128);
        assert_eq!(c.g, 64);
        assert_eq!(c.b, 0);
        assert_eq!(c.a, 128);
    }

    #[test]
    fn busy_flag_is_exclusive_until_released() {
        let flag = BusyFlag::new();
        assert!(!flag.is_busy());
        assert!(flag.try_acquire());
        assert!(flag.is_busy());
        assert!(!flag.try_acquire());
        let clone = flag.clone();
        assert!(clone.is_busy());
        flag.release();
        assert!(clone.try_acquire());
    }
}
