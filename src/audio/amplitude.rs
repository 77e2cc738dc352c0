//! Amplitude curve: the per-source loudness profile driving the waveform presets.

use crate::audio::decode::{ANALYSIS_SAMPLE_RATE, decode_audio_f32_mono};
use crate::foundation::error::AudiogramResult;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, mpsc};

/// Floor applied to the normalization divisor so silent input maps near zero instead of
/// blowing up.
const NORMALIZE_FLOOR: f32 = 1e-3;

/// Fixed-length loudness profile in `[0, 1]`, one bucket per equal slice of the clip.
///
/// Derived once per audio source and immutable afterwards; every preview scrub and every
/// export frame reads the same buckets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AmplitudeCurve {
    values: Vec<f32>,
}

impl AmplitudeCurve {
    /// Bucket count used when the caller has no reason to pick another.
    pub const DEFAULT_BUCKETS: usize = 30;

    /// Build a curve from raw values. Intended for tests and synthetic fixtures; values are
    /// clamped into `[0, 1]`.
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            values: values.into_iter().map(|v| v.clamp(0.0, 1.0)).collect(),
        }
    }

    /// Partition `samples` into `buckets` equal windows (the last may run short), take the
    /// mean absolute amplitude of each, and normalize by the loudest window.
    pub fn from_samples(samples: &[f32], buckets: usize) -> Self {
        if buckets == 0 {
            return Self::default();
        }
        let mut values = vec![0.0f32; buckets];
        if samples.is_empty() {
            return Self { values };
        }

        for (i, v) in values.iter_mut().enumerate() {
            let start = i * samples.len() / buckets;
            let end = (i + 1) * samples.len() / buckets;
            if start >= end {
                continue;
            }
            let sum: f64 = samples[start..end].iter().map(|s| f64::from(s.abs())).sum();
            *v = (sum / (end - start) as f64) as f32;
        }

        let peak = values.iter().copied().fold(0.0f32, f32::max);
        let divisor = peak.max(NORMALIZE_FLOOR);
        for v in &mut values {
            *v = (*v / divisor).clamp(0.0, 1.0);
        }
        Self { values }
    }

    /// Bucket values in clip order.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Bucket count.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the curve has no buckets.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the bucket covering `fraction` of the clip (`0.0` at the start, `1.0` at the
    /// end). Empty curve returns `0.0`; out-of-range fractions clamp to the edge buckets.
    pub fn value_at(&self, fraction: f64) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let f = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let idx = ((f * self.values.len() as f64) as usize).min(self.values.len() - 1);
        self.values[idx]
    }
}

/// Decode `path` and derive its amplitude curve in one pass.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn extract_curve(path: impl AsRef<Path>, buckets: usize) -> AudiogramResult<AmplitudeCurve> {
    let pcm = decode_audio_f32_mono(path.as_ref(), ANALYSIS_SAMPLE_RATE)?;
    let curve = AmplitudeCurve::from_samples(&pcm.samples, buckets);
    tracing::debug!(
        buckets,
        samples = pcm.samples.len(),
        duration_secs = pcm.duration_secs(),
        "amplitude curve extracted"
    );
    Ok(curve)
}

/// Result of polling a [`CurveTicket`].
#[derive(Clone, Debug, PartialEq)]
pub enum CurvePoll {
    /// The worker has not finished yet.
    Pending,
    /// The curve is ready and still the latest requested.
    Ready(AmplitudeCurve),
    /// A newer `begin` superseded this ticket; the result (if any) was discarded.
    Stale,
    /// Extraction failed.
    Failed(String),
}

/// Background, cancellable curve extraction with latest-generation-wins semantics.
///
/// Each `begin` bumps the extractor's generation and hands back a ticket stamped with it.
/// Only the ticket matching the latest generation can ever observe `Ready`; in-flight work
/// for earlier tickets is abandoned from the caller's point of view the moment a newer
/// `begin` happens, even if its worker later completes.
#[derive(Debug, Default)]
pub struct CurveExtractor {
    generation: Arc<AtomicU64>,
}

impl CurveExtractor {
    /// Create an extractor with no work in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start extracting `path` in the background and return the ticket for this request.
    pub fn begin(&self, path: impl Into<PathBuf>, buckets: usize) -> CurveTicket {
        let path = path.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel();

        let job = move || {
            let result = extract_curve(&path, buckets).map_err(|e| e.to_string());
            let _ = tx.send(result);
        };
        // A host that cannot spawn threads still gets its curve, just synchronously.
        if let Err(e) = std::thread::Builder::new()
            .name("amplitude-curve".to_owned())
            .spawn(job.clone())
        {
            tracing::warn!(error = %e, "curve worker spawn failed; extracting inline");
            job();
        }

        CurveTicket {
            generation,
            latest: Arc::clone(&self.generation),
            rx,
        }
    }
}

/// Handle to one in-flight (or finished) curve extraction.
#[derive(Debug)]
pub struct CurveTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
    rx: mpsc::Receiver<Result<AmplitudeCurve, String>>,
}

impl CurveTicket {
    /// Whether a newer request has superseded this ticket.
    pub fn is_stale(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.generation
    }

    /// Non-blocking check of the extraction state. A stale ticket reports `Stale` no matter
    /// how its worker finished.
    pub fn poll(&self) -> CurvePoll {
        if self.is_stale() {
            return CurvePoll::Stale;
        }
        let received = match self.rx.try_recv() {
            Ok(r) => r,
            Err(mpsc::TryRecvError::Empty) => return CurvePoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                return CurvePoll::Failed("curve worker disappeared".to_owned());
            }
        };
        self.resolve(received)
    }

    /// Block until the worker finishes, then resolve like [`CurveTicket::poll`].
    pub fn wait(self) -> CurvePoll {
        let received = match self.rx.recv() {
            Ok(r) => r,
            Err(_) => return CurvePoll::Failed("curve worker disappeared".to_owned()),
        };
        self.resolve(received)
    }

    fn resolve(&self, received: Result<AmplitudeCurve, String>) -> CurvePoll {
        if self.is_stale() {
            return CurvePoll::Stale;
        }
        match received {
            Ok(curve) => CurvePoll::Ready(curve),
            Err(msg) => CurvePoll::Failed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_amplitude_normalizes_to_uniform_ones() {
        // 3 s of constant 0.5 at the analysis rate, 30 buckets.
        let samples = vec![0.5f32; (ANALYSIS_SAMPLE_RATE as usize) * 3];
        let curve = AmplitudeCurve::from_samples(&samples, 30);
        assert_eq!(curve.len(), 30);
        for &v in curve.values() {
            assert!((v - 1.0).abs() < 1e-6, "expected 1.0, got {v}");
        }
    }

    #[test]
    fn silence_stays_near_zero_without_erroring() {
        let samples = vec![0.0f32; 48_000];
        let curve = AmplitudeCurve::from_samples(&samples, 30);
        assert_eq!(curve.len(), 30);
        assert!(curve.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn loudest_window_normalizes_to_one() {
        let mut samples = vec![0.1f32; 3_000];
        for s in &mut samples[1_000..2_000] {
            *s = 0.8;
        }
        let curve = AmplitudeCurve::from_samples(&samples, 3);
        assert!((curve.values()[1] - 1.0).abs() < 1e-6);
        assert!(curve.values()[0] < curve.values()[1]);
        assert!((curve.values()[0] - curve.values()[2]).abs() < 1e-6);
    }

    #[test]
    fn short_input_fills_trailing_buckets_with_zero() {
        // Fewer samples than buckets: integer partition leaves some windows empty.
        let samples = vec![0.5f32; 7];
        let curve = AmplitudeCurve::from_samples(&samples, 30);
        assert_eq!(curve.len(), 30);
        assert!(curve.values().iter().any(|&v| v == 1.0));
        assert!(curve.values().iter().any(|&v| v == 0.0));
    }

    #[test]
    fn value_at_picks_the_covering_bucket() {
        let curve = AmplitudeCurve::from_values(vec![0.1, 0.5, 0.9]);
        assert_eq!(curve.value_at(0.0), 0.1);
        assert_eq!(curve.value_at(0.34), 0.5);
        assert_eq!(curve.value_at(0.99), 0.9);
        assert_eq!(curve.value_at(1.0), 0.9);
        assert_eq!(curve.value_at(-2.0), 0.1);
        assert_eq!(curve.value_at(f64::NAN), 0.1);
        assert_eq!(AmplitudeCurve::default().value_at(0.5), 0.0);
    }

    #[test]
    fn newer_begin_invalidates_older_ticket() {
        let extractor = CurveExtractor::new();
        let first = extractor.begin("/no/such/file-a.mp3", 30);
        let second = extractor.begin("/no/such/file-b.mp3", 30);

        assert!(first.is_stale());
        assert_eq!(first.poll(), CurvePoll::Stale);
        // The stale ticket stays stale even after its worker finishes.
        assert_eq!(first.wait(), CurvePoll::Stale);

        assert!(!second.is_stale());
        match second.wait() {
            CurvePoll::Failed(_) => {}
            other => panic!("missing file should fail extraction, got {other:?}"),
        }
    }
}
