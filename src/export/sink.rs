use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRGBA};
use crate::foundation::error::AudiogramResult;
use std::path::PathBuf;

/// Configuration handed to a [`FrameSink`] at the start of an export attempt.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output raster dimensions.
    pub canvas: Canvas,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Optional audio track muxed into the container.
    pub audio: Option<AudioInputConfig>,
}

/// Audio input for sinks that mux sound.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Source audio file in any container ffmpeg can demux (mp3/wav/m4a/...).
    pub path: PathBuf,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order
/// within one attempt.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> AudiogramResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> AudiogramResult<()>;
    /// Called once after the last frame; finalizes the output.
    fn end(&mut self) -> AudiogramResult<()>;
    /// Tear down a cancelled or failed attempt without finalizing. Must leave no live
    /// child process behind.
    fn abort(&mut self) {}
    /// The file this sink writes, when it writes one. The pipeline stats it before
    /// reporting success.
    fn artifact_path(&self) -> Option<&std::path::Path> {
        None
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// The captured frames, in push order.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Whether the attempt was torn down via [`FrameSink::abort`].
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> AudiogramResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> AudiogramResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> AudiogramResult<()> {
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_records_config_and_frames() {
        let mut sink = InMemorySink::new();
        assert!(sink.config().is_none());

        let cfg = SinkConfig {
            canvas: Canvas {
                width: 4,
                height: 2,
            },
            fps: Fps::TIMELINE,
            audio: None,
        };
        sink.begin(cfg).unwrap();
        assert_eq!(sink.config().unwrap().canvas.width, 4);

        let frame = FrameRGBA {
            width: 4,
            height: 2,
            data: vec![0; 32],
            premultiplied: true,
        };
        sink.push_frame(FrameIndex(0), &frame).unwrap();
        sink.push_frame(FrameIndex(1), &frame).unwrap();
        sink.end().unwrap();

        assert_eq!(sink.frames().len(), 2);
        assert_eq!(sink.frames()[1].0, FrameIndex(1));
        assert!(!sink.was_aborted());
        assert!(sink.artifact_path().is_none());
    }

    #[test]
    fn begin_resets_captured_state() {
        let mut sink = InMemorySink::new();
        let cfg = SinkConfig {
            canvas: Canvas::HD,
            fps: Fps::TIMELINE,
            audio: None,
        };
        sink.begin(cfg.clone()).unwrap();
        let frame = FrameRGBA {
            width: 1920,
            height: 1080,
            data: Vec::new(),
            premultiplied: true,
        };
        sink.push_frame(FrameIndex(0), &frame).unwrap();
        sink.abort();
        assert!(sink.was_aborted());

        sink.begin(cfg).unwrap();
        assert!(sink.frames().is_empty());
        assert!(!sink.was_aborted());
    }
}
