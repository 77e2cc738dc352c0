//! Audiogram turns podcast audio into shareable video clips.
//!
//! A project bundles an audio file, timed captions, a style document and an element
//! layout. One deterministic compositor serves both surfaces, so the preview is the
//! export:
//!
//! - Load a [`Project`] and [`Project::prepare`] it into [`RenderInputs`]
//! - Preview, scrub and drag elements through a [`PlaybackController`]
//! - Stream frames into the system `ffmpeg` with an [`ExportRunner`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Logo and background image preparation.
pub mod assets;
/// Audio decode and the amplitude curve.
pub mod audio;
/// Caption track model.
pub mod captions;
/// MP4 export pipeline.
pub mod export;
/// Shared primitives.
pub mod foundation;
/// Element layout, hit-testing and drag clamping.
pub mod layout;
/// Interactive preview.
pub mod playback;
/// The project document.
pub mod project;
/// The frame compositor.
pub mod render;
/// Style documents.
pub mod style;

pub use crate::foundation::core::{BusyFlag, Canvas, Fps, FrameIndex, FrameRGBA};
pub use crate::foundation::error::{AudiogramError, AudiogramResult};

pub use crate::captions::{CaptionSegment, CaptionTrack, WordSpan};
pub use crate::export::pipeline::{
    ExportEvent, ExportHandle, ExportJob, ExportOutcome, ExportRunner, ExportState,
};
pub use crate::layout::{HitTarget, LayoutConfig};
pub use crate::playback::{AudioTransport, DragSession, PlaybackController, PlaybackState};
pub use crate::project::Project;
pub use crate::render::{Compositor, RenderInputs};
pub use crate::style::{Color, StyleConfig};
