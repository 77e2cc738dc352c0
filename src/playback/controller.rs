use crate::foundation::core::{BusyFlag, Canvas, FrameRGBA};
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::render::{Compositor, RenderInputs};

/// External audio playback collaborator.
///
/// The host owns the actual audio device (or a decoded-PCM clock in tests); the
/// controller only asks it where the clock is and tells it to move.
pub trait AudioTransport {
    /// Total clip length in seconds. Errs while metadata is unavailable.
    fn duration(&self) -> AudiogramResult<f64>;
    /// Current clock in seconds.
    fn position(&self) -> f64;
    /// Move the clock.
    fn set_position(&mut self, secs: f64);
    /// Start or resume playback.
    fn play(&mut self) -> AudiogramResult<()>;
    /// Pause playback, keeping the clock.
    fn pause(&mut self);
    /// Whether playback ran off the end of the clip.
    fn ended(&self) -> bool;
}

/// Controller states. Seeking is transient inside [`PlaybackController::seek`] and never
/// observable between calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// No audio loaded yet.
    #[default]
    Idle,
    /// Audio loaded, clock parked.
    Loaded,
    /// Transport running.
    Playing,
    /// Paused mid-clip.
    Paused,
}

/// Preview playback driver: owns a compositor and the live render inputs, reads time
/// from the transport, and hands frames back to the host.
pub struct PlaybackController<T: AudioTransport> {
    transport: T,
    inputs: RenderInputs,
    compositor: Compositor,
    busy: BusyFlag,
    state: PlaybackState,
    duration: f64,
}

impl<T: AudioTransport> PlaybackController<T> {
    /// Build an idle controller. `busy` is the flag shared with the export runner.
    pub fn new(transport: T, inputs: RenderInputs, canvas: Canvas, busy: BusyFlag) -> Self {
        Self {
            transport,
            inputs,
            compositor: Compositor::new(canvas),
            busy,
            state: PlaybackState::Idle,
            duration: 0.0,
        }
    }

    /// Current controller state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Clip duration in seconds; `0.0` before [`load`](Self::load) succeeds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// The transport clock in seconds.
    pub fn position(&self) -> f64 {
        self.transport.position()
    }

    /// Live render inputs.
    pub fn inputs(&self) -> &RenderInputs {
        &self.inputs
    }

    /// Mutable render inputs for style and layout edits; the next rendered frame picks
    /// them up.
    pub fn inputs_mut(&mut self) -> &mut RenderInputs {
        &mut self.inputs
    }

    /// Resolve the clip duration from the transport and move to `Loaded`.
    ///
    /// Returns the duration on success. On failure the controller stays `Idle` and the
    /// error carries the user-facing "Could not load audio" message.
    pub fn load(&mut self) -> AudiogramResult<f64> {
        let d = self
            .transport
            .duration()
            .map_err(|e| AudiogramError::media(format!("Could not load audio: {e}")))?;
        if !d.is_finite() || d <= 0.0 {
            return Err(AudiogramError::media(
                "Could not load audio: empty or unknown duration",
            ));
        }
        self.duration = d;
        self.inputs.duration = d;
        self.state = PlaybackState::Loaded;
        tracing::debug!(duration_secs = d, "audio loaded");
        Ok(d)
    }

    /// Start or resume playback. Returns `false` without touching the transport when
    /// nothing is loaded or an export currently holds the busy flag.
    pub fn play(&mut self) -> AudiogramResult<bool> {
        if self.state == PlaybackState::Idle {
            return Ok(false);
        }
        if self.busy.is_busy() {
            tracing::debug!("play refused while an export is running");
            return Ok(false);
        }
        self.transport.play()?;
        self.state = PlaybackState::Playing;
        Ok(true)
    }

    /// Pause playback, keeping the clock where it is.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.transport.pause();
            self.state = PlaybackState::Paused;
        }
    }

    /// One host tick: read the transport clock and composite the frame at it.
    ///
    /// Returns `None` while idle. When the transport reports the clip ended, the
    /// controller drops back to `Loaded`; the final frame is still rendered.
    pub fn tick(&mut self) -> AudiogramResult<Option<FrameRGBA>> {
        if self.state == PlaybackState::Idle {
            return Ok(None);
        }
        if self.state == PlaybackState::Playing && self.transport.ended() {
            self.state = PlaybackState::Loaded;
        }
        let t = self.transport.position();
        let frame = self.compositor.render(&self.inputs, t)?;
        Ok(Some(frame))
    }

    /// Move the clock to `secs` (clamped into the clip) and synchronously composite that
    /// exact frame, so scrubbing never waits for the next tick.
    pub fn seek(&mut self, secs: f64) -> AudiogramResult<FrameRGBA> {
        if self.state == PlaybackState::Idle {
            return Err(AudiogramError::validation("seek before audio is loaded"));
        }
        let t = if secs.is_finite() {
            secs.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.transport.set_position(t);
        self.compositor.render(&self.inputs, t)
    }

    /// Composite the frame at the current clock without touching the transport. Style
    /// and layout edits use this to refresh the preview while paused.
    pub fn render_current(&mut self) -> AudiogramResult<FrameRGBA> {
        let t = if self.state == PlaybackState::Idle {
            0.0
        } else {
            self.transport.position()
        };
        self.compositor.render(&self.inputs, t)
    }
}
