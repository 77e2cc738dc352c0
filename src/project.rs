//! The project document: one JSON file tying together audio, captions, style and layout.
//!
//! Loading is permissive (missing sections fall back to defaults), validation is explicit,
//! and [`Project::prepare`] is the one place a document turns into render-ready inputs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::assets;
use crate::audio::amplitude::AmplitudeCurve;
use crate::audio::decode::{ANALYSIS_SAMPLE_RATE, decode_audio_f32_mono};
use crate::captions::CaptionTrack;
use crate::foundation::core::Canvas;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::layout::LayoutConfig;
use crate::render::RenderInputs;
use crate::style::StyleConfig;

/// One audiogram project as the editor saves it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    /// Source audio file. Required for rendering; optional in the document so a
    /// half-edited project still loads.
    pub audio: Option<PathBuf>,
    /// Timed caption track.
    pub captions: CaptionTrack,
    /// Visual style.
    pub style: StyleConfig,
    /// Element placement.
    pub layout: LayoutConfig,
}

impl Project {
    /// Parse a project document from JSON text.
    pub fn from_json(json: &str) -> AudiogramResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a project document from disk.
    pub fn load(path: &Path) -> AudiogramResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Run every section's validation gate.
    pub fn validate(&self) -> AudiogramResult<()> {
        self.style.validate()?;
        self.layout.validate()?;
        self.captions.validate()?;
        Ok(())
    }

    /// Turn the document into render-ready inputs.
    ///
    /// The audio file must decode; its PCM supplies both the clip duration and the
    /// amplitude curve. Logo and background are best-effort: a file that fails to
    /// load is logged and skipped, matching how the interactive editor degrades.
    #[tracing::instrument(skip(self), fields(audio = ?self.audio))]
    pub fn prepare(&self, canvas: Canvas, buckets: usize) -> AudiogramResult<RenderInputs> {
        self.validate()?;
        let audio = self
            .audio
            .as_deref()
            .ok_or_else(|| AudiogramError::validation("project has no audio file"))?;

        let pcm = decode_audio_f32_mono(audio, ANALYSIS_SAMPLE_RATE)?;
        let duration = pcm.duration_secs();
        let amplitude = AmplitudeCurve::from_samples(&pcm.samples, buckets);

        let logo = self.style.logo.as_deref().and_then(|path| {
            match assets::load_logo(path) {
                Ok(img) => Some(img),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "logo skipped");
                    None
                }
            }
        });
        let background = self.style.background.image.as_deref().and_then(|path| {
            match assets::prepare_background(path, canvas, self.style.background.blur) {
                Ok(img) => Some(img),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "background skipped");
                    None
                }
            }
        });

        let mut layout = self.layout;
        layout.clamp_footprints();

        tracing::debug!(
            duration_secs = duration,
            captions = self.captions.len(),
            has_logo = logo.is_some(),
            has_background = background.is_some(),
            "project prepared"
        );
        Ok(RenderInputs {
            style: self.style.clone(),
            layout,
            captions: self.captions.clone(),
            amplitude,
            logo,
            background,
            duration,
        })
    }
}
