//! MP4 export: parallel frame production, ordered encoding, progress events.
//!
//! [`ExportRunner`] drives one attempt at a time on a background thread;
//! [`run_with_sink`] is the synchronous core, usable with any [`FrameSink`].

/// `ffmpeg`-based sink (MP4 output via the system `ffmpeg`).
pub mod ffmpeg;
/// Frame production pipeline, background runner and progress events.
pub mod pipeline;
/// Generic frame sink trait and built-in sinks.
pub mod sink;

pub use ffmpeg::{
    FfmpegSink, FfmpegSinkOpts, flatten_premul_over_bg_to_opaque_rgba8, is_ffmpeg_on_path,
};
pub use pipeline::{
    CancelToken, ExportEvent, ExportHandle, ExportJob, ExportOutcome, ExportRunner, ExportState,
    default_output_path, run_with_sink,
};
pub use sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
