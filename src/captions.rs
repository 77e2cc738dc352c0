//! Caption track model and karaoke word lookup.
//!
//! Captions arrive as an ordered JSON list of segments with optional per-word timings. The
//! track is pass-through: it never merges, splits or fabricates segments, so overlap and gap
//! behavior is exactly what the transcription engine produced.

use crate::foundation::error::{AudiogramError, AudiogramResult};
use serde::{Deserialize, Serialize};

/// One timed word inside a caption segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordSpan {
    /// The word text as displayed.
    pub word: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
}

impl WordSpan {
    /// Whether `time` falls inside this word's half-open interval.
    pub fn is_current(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }
}

/// One caption segment: display text over a half-open time interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSegment {
    /// Full segment text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
    /// Optional word timings; empty when the engine produced none.
    #[serde(default)]
    pub words: Vec<WordSpan>,
}

impl CaptionSegment {
    /// Whether `time` falls inside this segment's half-open interval.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }
}

/// Ordered caption segments for one audio source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionTrack {
    segments: Vec<CaptionSegment>,
}

impl CaptionTrack {
    /// Wrap an ordered segment list. Order is preserved as given.
    pub fn new(segments: Vec<CaptionSegment>) -> Self {
        Self { segments }
    }

    /// All segments in track order.
    pub fn segments(&self) -> &[CaptionSegment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the track has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment active at `time`: the first one (in track order) whose
    /// `start <= time < end`. Total over all inputs; gaps simply return `None`.
    pub fn active_at(&self, time: f64) -> Option<&CaptionSegment> {
        self.segments.iter().find(|s| s.contains(time))
    }

    /// Reject segments with `start >= end` and tracks whose segment starts go backwards.
    pub fn validate(&self) -> AudiogramResult<()> {
        let mut prev_start = f64::NEG_INFINITY;
        for (i, seg) in self.segments.iter().enumerate() {
            if !seg.start.is_finite() || !seg.end.is_finite() || seg.start >= seg.end {
                return Err(AudiogramError::validation(format!(
                    "caption segment {i} has invalid interval [{}, {})",
                    seg.start, seg.end
                )));
            }
            if seg.start < prev_start {
                return Err(AudiogramError::validation(format!(
                    "caption segment {i} starts before its predecessor"
                )));
            }
            prev_start = seg.start;
            for (j, w) in seg.words.iter().enumerate() {
                if !w.start.is_finite() || !w.end.is_finite() || w.start >= w.end {
                    return Err(AudiogramError::validation(format!(
                        "caption segment {i} word {j} has invalid interval [{}, {})",
                        w.start, w.end
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, end: f64) -> CaptionSegment {
        CaptionSegment {
            text: text.to_owned(),
            start,
            end,
            words: Vec::new(),
        }
    }

    fn track() -> CaptionTrack {
        CaptionTrack::new(vec![seg("one", 0.0, 2.0), seg("two", 4.5, 6.0), seg("three", 6.0, 7.0)])
    }

    #[test]
    fn active_lookup_uses_half_open_intervals() {
        let t = track();
        assert_eq!(t.active_at(0.0).unwrap().text, "one");
        assert_eq!(t.active_at(1.999).unwrap().text, "one");
        assert!(t.active_at(2.0).is_none());
        assert!(t.active_at(3.0).is_none());
        assert_eq!(t.active_at(5.0).unwrap().text, "two");
        // Shared boundary: exclusive end hands off to the next segment's inclusive start.
        assert_eq!(t.active_at(6.0).unwrap().text, "three");
        assert!(t.active_at(7.0).is_none());
        assert!(t.active_at(-1.0).is_none());
    }

    #[test]
    fn overlapping_segments_resolve_to_first_in_order() {
        let t = CaptionTrack::new(vec![seg("a", 0.0, 3.0), seg("b", 2.0, 4.0)]);
        assert_eq!(t.active_at(2.5).unwrap().text, "a");
        assert_eq!(t.active_at(3.5).unwrap().text, "b");
        t.validate().unwrap();
    }

    #[test]
    fn word_state_containment() {
        let w = WordSpan {
            word: "hey".to_owned(),
            start: 1.0,
            end: 1.4,
        };
        assert!(!w.is_current(0.99));
        assert!(w.is_current(1.0));
        assert!(w.is_current(1.39));
        assert!(!w.is_current(1.4));
    }

    #[test]
    fn validate_rejects_bad_intervals_and_order() {
        let t = CaptionTrack::new(vec![seg("x", 2.0, 2.0)]);
        assert!(t.validate().is_err());

        let t = CaptionTrack::new(vec![seg("x", 3.0, 4.0), seg("y", 1.0, 2.0)]);
        assert!(t.validate().is_err());

        let mut bad_word = seg("x", 0.0, 1.0);
        bad_word.words.push(WordSpan {
            word: "x".to_owned(),
            start: 0.5,
            end: 0.5,
        });
        assert!(CaptionTrack::new(vec![bad_word]).validate().is_err());

        track().validate().unwrap();
        CaptionTrack::default().validate().unwrap();
    }

    #[test]
    fn decodes_from_plain_json_array() {
        let t: CaptionTrack = serde_json::from_str(
            r#"[
                { "text": "hello there", "start": 0.0, "end": 1.2,
                  "words": [
                    { "word": "hello", "start": 0.0, "end": 0.5 },
                    { "word": "there", "start": 0.5, "end": 1.2 }
                  ] },
                { "text": "again", "start": 1.2, "end": 2.0 }
            ]"#,
        )
        .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.segments()[0].words.len(), 2);
        assert!(t.segments()[1].words.is_empty());
        t.validate().unwrap();
    }
}
