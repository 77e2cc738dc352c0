//! Interactive preview: transport-driven playback and drag-to-place layout editing.
//!
//! The controller never advances its own clock. Every frame it draws reads the position
//! from an injected [`AudioTransport`], so the preview can only show what the listener
//! hears, and a stalled transport freezes the picture instead of drifting past it.

mod controller;
mod drag;

pub use controller::{AudioTransport, PlaybackController, PlaybackState};
pub use drag::DragSession;

/// Format seconds as `m:ss` for the transport clock readout. Negative and non-finite
/// inputs render as `0:00`.
pub fn format_clock(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_owned();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats_minutes_and_padded_seconds() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(7.9), "0:07");
        assert_eq!(format_clock(60.0), "1:00");
        assert_eq!(format_clock(61.2), "1:01");
        assert_eq!(format_clock(600.0), "10:00");
        assert_eq!(format_clock(3599.99), "59:59");
        assert_eq!(format_clock(3600.0), "60:00");
    }

    #[test]
    fn clock_falls_back_on_bad_input() {
        assert_eq!(format_clock(-1.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_clock(f64::INFINITY), "0:00");
    }
}
