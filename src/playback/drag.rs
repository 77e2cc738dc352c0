use crate::foundation::core::BusyFlag;
use crate::layout::{HitTarget, LayoutConfig};

/// One press-drag-release interaction against the layout.
///
/// Pointer positions are normalized canvas coordinates. The session keeps the grab
/// offset from the press, so the element moves with the pointer instead of snapping its
/// anchor under it. Moves coalesce: between flushes only the newest pointer position is
/// kept, which keeps a slow render loop from replaying a backlog of stale positions.
pub struct DragSession {
    target: HitTarget,
    grab_dx: f64,
    grab_dy: f64,
    pending: Option<(f64, f64)>,
}

impl DragSession {
    /// Hit-test the press position and open a session on the element under it.
    ///
    /// Returns `None` when nothing draggable is under the pointer, or while an export
    /// holds the busy flag.
    pub fn begin(
        layout: &LayoutConfig,
        nx: f64,
        ny: f64,
        has_logo: bool,
        title_visible: bool,
        busy: &BusyFlag,
    ) -> Option<Self> {
        if busy.is_busy() {
            tracing::debug!("drag refused while an export is running");
            return None;
        }
        let target = layout.hit_test(nx, ny, has_logo, title_visible)?;
        let (ax, ay) = anchor_of(layout, target);
        Some(Self {
            target,
            grab_dx: nx - ax,
            grab_dy: ny - ay,
            pending: None,
        })
    }

    /// The element this session drags.
    pub fn target(&self) -> HitTarget {
        self.target
    }

    /// Record the newest pointer position, discarding any unflushed one.
    pub fn update(&mut self, nx: f64, ny: f64) {
        self.pending = Some((nx, ny));
    }

    /// Apply the newest pending move to `layout`. Returns `true` when the layout moved
    /// and the host should re-render.
    pub fn flush(&mut self, layout: &mut LayoutConfig) -> bool {
        let Some((nx, ny)) = self.pending.take() else {
            return false;
        };
        layout.move_target(self.target, nx - self.grab_dx, ny - self.grab_dy);
        true
    }

    /// Flush any pending move and end the session. Returns the dragged target so the
    /// host can persist the updated layout.
    pub fn release(mut self, layout: &mut LayoutConfig) -> HitTarget {
        self.flush(layout);
        self.target
    }
}

/// The layout anchor `move_target` writes for each element.
fn anchor_of(layout: &LayoutConfig, target: HitTarget) -> (f64, f64) {
    match target {
        HitTarget::Logo => (layout.logo.x, layout.logo.y),
        HitTarget::Title => (layout.title.x, layout.title.y),
        HitTarget::Waveform => (layout.waveform.center_x, layout.waveform.center_y),
        HitTarget::Subtitle => (0.0, layout.subtitle.center_y),
        HitTarget::ProgressBar => (0.0, layout.progress_bar.y),
    }
}
