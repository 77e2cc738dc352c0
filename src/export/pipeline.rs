use crate::export::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::export::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{BusyFlag, Canvas, Fps, FrameIndex, FrameRGBA};
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::render::{Compositor, RenderInputs};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, mpsc};

/// Reorder-buffer backpressure: workers stall once this many frames are in flight.
const CHANNEL_CAPACITY: usize = 4;

/// Lifecycle of one export attempt, reported through [`ExportEvent::State`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportState {
    /// No attempt running.
    #[default]
    Idle,
    /// Validating the job and starting the encoder.
    Initializing,
    /// Rasterizing frames and streaming them to the encoder.
    Rendering,
    /// Frames delivered, waiting for the container to finish.
    Muxing,
    /// Verifying the output artifact.
    Finalizing,
    /// Artifact written.
    Done,
    /// Attempt failed; a [`ExportEvent::Failed`] carries the message.
    Error,
    /// Attempt stopped on request; no artifact is kept.
    Cancelled,
}

/// Progress stream of an export attempt.
///
/// Exactly one terminal event ends the stream: `Done`, `Failed`, or
/// `State(Cancelled)`.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportEvent {
    /// The attempt moved to a new lifecycle state.
    State(ExportState),
    /// Percent complete, monotonically non-decreasing across the attempt.
    Progress {
        /// Short human-readable stage label.
        label: String,
        /// `0.0..=100.0`.
        percent: f64,
    },
    /// The artifact at the given path is complete and verified.
    Done(PathBuf),
    /// The attempt failed with this message.
    Failed(String),
}

/// How a completed `run_with_sink` call ended (errors are returned separately).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The artifact was written and verified.
    Done(PathBuf),
    /// Cancellation was observed; partial output has been discarded.
    Cancelled,
}

/// Cooperative cancellation flag, shared between the requesting side and the
/// export workers. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one export attempt needs, captured up front so the attempt is
/// unaffected by later edits to the interactive session.
#[derive(Clone, Debug)]
pub struct ExportJob {
    /// Snapshot of the render inputs.
    pub inputs: Arc<RenderInputs>,
    /// Source audio file muxed into the MP4; `None` renders a silent video.
    pub audio: Option<PathBuf>,
    /// Output MP4 path.
    pub out_path: PathBuf,
    /// Frame rate of the output.
    pub fps: Fps,
    /// Output resolution.
    pub canvas: Canvas,
    /// Worker thread count; `None` uses the process-wide pool.
    pub threads: Option<usize>,
}

/// Default artifact name inside `dir`: `podcast-video-{unix millis}.mp4`.
pub fn default_output_path(dir: &Path) -> PathBuf {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    dir.join(format!("podcast-video-{millis}.mp4"))
}

/// Event sender with a monotonic progress floor.
///
/// Frames finish out of order, so raw per-stage percentages can regress; the floor
/// makes every reported percent the max seen so far.
#[derive(Clone)]
struct EventFeed {
    tx: mpsc::Sender<ExportEvent>,
    floor_centi: Arc<AtomicU64>,
}

impl EventFeed {
    fn new(tx: mpsc::Sender<ExportEvent>) -> Self {
        Self {
            tx,
            floor_centi: Arc::new(AtomicU64::new(0)),
        }
    }

    fn state(&self, state: ExportState) {
        // A hung-up receiver only means nobody is listening anymore.
        let _ = self.tx.send(ExportEvent::State(state));
    }

    fn progress(&self, label: &str, percent: f64) {
        let centi = (percent.clamp(0.0, 100.0) * 100.0).round() as u64;
        let floor = self.floor_centi.fetch_max(centi, Ordering::SeqCst).max(centi);
        let _ = self.tx.send(ExportEvent::Progress {
            label: label.to_string(),
            percent: floor as f64 / 100.0,
        });
    }
}

/// Removes the output file on drop unless disarmed, so failed or cancelled
/// attempts leave no partial artifact behind.
struct TempFileGuard {
    path: Option<PathBuf>,
}

impl TempFileGuard {
    /// Arm only when `path` does not exist yet; a file the user already had is
    /// never deleted by a failed attempt.
    fn for_attempt(path: &Path) -> Self {
        let armed = !path.exists();
        Self {
            path: armed.then(|| path.to_path_buf()),
        }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(&path);
        }
    }
}

struct FrameMsg {
    idx: FrameIndex,
    frame: Arc<FrameRGBA>,
}

fn build_thread_pool(threads: Option<usize>) -> AudiogramResult<Option<rayon::ThreadPool>> {
    let Some(n) = threads else {
        return Ok(None);
    };
    if n == 0 {
        return Err(AudiogramError::validation("threads must be >= 1 when set"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build render pool: {e}"))?;
    Ok(Some(pool))
}

/// Run one export attempt against `sink`, reporting progress on `tx`.
///
/// Frames are rasterized in parallel, reordered back into timeline order and fed
/// to the sink one at a time. On error or observed cancellation the sink is
/// aborted and any output file this attempt created is removed; the sink's
/// artifact (if any) survives only on `Ok(ExportOutcome::Done)`.
#[tracing::instrument(skip_all, fields(out = %job.out_path.display()))]
pub fn run_with_sink(
    job: &ExportJob,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
    tx: &mpsc::Sender<ExportEvent>,
) -> AudiogramResult<ExportOutcome> {
    let started = std::time::Instant::now();
    let feed = EventFeed::new(tx.clone());
    feed.state(ExportState::Initializing);
    feed.progress("Preparing export", 2.0);

    let total = job.fps.frames_covering(job.inputs.duration);
    if total == 0 {
        return Err(AudiogramError::validation(
            "nothing to export: clip duration is zero",
        ));
    }

    let pool = build_thread_pool(job.threads)?;
    let mut guard = TempFileGuard::for_attempt(&job.out_path);
    let cfg = SinkConfig {
        canvas: job.canvas,
        fps: job.fps,
        audio: job.audio.clone().map(|path| AudioInputConfig { path }),
    };
    feed.progress("Preparing export", 5.0);

    let scope_result = {
        let enc_feed = feed.clone();
        let enc_sink: &mut dyn FrameSink = &mut *sink;
        std::thread::scope(move |scope| -> AudiogramResult<u64> {
            let (ftx, frx) = mpsc::sync_channel::<FrameMsg>(CHANNEL_CAPACITY);

            let encoder = scope.spawn(move || -> AudiogramResult<u64> {
                enc_sink.begin(cfg)?;
                enc_feed.state(ExportState::Rendering);

                // Frames arrive out of order; hold them until the next timeline
                // index shows up. Capacity bounds how far ahead workers can run.
                let mut pending: HashMap<u64, Arc<FrameRGBA>> = HashMap::new();
                let mut next: u64 = 0;
                while next < total {
                    let Ok(msg) = frx.recv() else {
                        // Workers stopped early (cancel or error); keep the
                        // contiguous prefix that was delivered.
                        break;
                    };
                    pending.insert(msg.idx.0, msg.frame);
                    while let Some(frame) = pending.remove(&next) {
                        enc_sink.push_frame(FrameIndex(next), &frame)?;
                        next += 1;
                        enc_feed.progress(
                            "Rendering frames",
                            5.0 + (next as f64 / total as f64) * 75.0,
                        );
                    }
                }
                Ok(next)
            });

            let produce = || -> AudiogramResult<()> {
                (0..total).into_par_iter().try_for_each_init(
                    || (Compositor::new(job.canvas), ftx.clone()),
                    |worker, i| {
                        let (compositor, ftx) = worker;
                        if cancel.is_cancelled() {
                            return Ok(());
                        }
                        let time = job.fps.frames_to_secs(FrameIndex(i));
                        let frame = compositor.render(&job.inputs, time).map_err(|e| {
                            AudiogramError::frame_encode(format!(
                                "frame {i} failed to rasterize: {e}"
                            ))
                        })?;
                        ftx.send(FrameMsg {
                            idx: FrameIndex(i),
                            frame: Arc::new(frame),
                        })
                        .map_err(|_| {
                            AudiogramError::frame_encode("encoder thread is not accepting frames")
                        })
                    },
                )
            };
            let produced = match pool.as_ref() {
                Some(pool) => pool.install(produce),
                None => produce(),
            };
            drop(ftx);

            // The encoder error is the root cause when both sides fail; a worker
            // that could not send was only reacting to it.
            let delivered = encoder
                .join()
                .map_err(|_| AudiogramError::frame_encode("encoder thread panicked"))??;
            produced?;
            Ok(delivered)
        })
    };
    let delivered = match scope_result {
        Ok(n) => n,
        Err(e) => {
            sink.abort();
            return Err(e);
        }
    };

    if cancel.is_cancelled() {
        sink.abort();
        tracing::info!(frames = delivered, "export cancelled");
        return Ok(ExportOutcome::Cancelled);
    }

    feed.state(ExportState::Muxing);
    feed.progress("Encoding video", 82.0);
    if let Err(e) = sink.end() {
        sink.abort();
        return Err(e);
    }

    feed.progress("Finalizing", 95.0);
    feed.state(ExportState::Finalizing);
    if let Some(path) = sink.artifact_path() {
        let meta = std::fs::metadata(path)
            .map_err(|e| AudiogramError::mux(format!("output file missing after mux: {e}")))?;
        tracing::info!(
            bytes = meta.len(),
            frames = delivered,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "export complete"
        );
    }
    guard.disarm();

    feed.progress("Finalizing", 100.0);
    feed.state(ExportState::Done);
    let _ = tx.send(ExportEvent::Done(job.out_path.clone()));
    Ok(ExportOutcome::Done(job.out_path.clone()))
}

/// Starts export attempts on a background thread, one at a time.
///
/// The runner shares a [`BusyFlag`] with playback: while an attempt holds it,
/// playback and dragging refuse to start, and a second attempt is rejected.
pub struct ExportRunner {
    busy: BusyFlag,
}

/// A running export attempt started by [`ExportRunner::start`].
///
/// Dropping the handle detaches the attempt; it keeps running and releases the
/// busy flag when it finishes.
#[derive(Debug)]
pub struct ExportHandle {
    /// Event stream; ends shortly after the terminal event.
    pub events: mpsc::Receiver<ExportEvent>,
    cancel: CancelToken,
    join: Option<std::thread::JoinHandle<()>>,
}

impl ExportHandle {
    /// Request cancellation of this attempt.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observing this attempt's cancellation flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the attempt's thread has finished.
    pub fn wait(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

struct ReleaseOnDrop(BusyFlag);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.release();
    }
}

impl ExportRunner {
    /// Runner sharing `busy` with the interactive side.
    pub fn new(busy: BusyFlag) -> Self {
        Self { busy }
    }

    /// Whether an attempt currently holds the busy flag.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Start `job` on a background thread.
    ///
    /// Fails if another attempt is still running. The flag is released when the
    /// attempt finishes, whatever the outcome.
    pub fn start(&self, job: ExportJob) -> AudiogramResult<ExportHandle> {
        if !self.busy.try_acquire() {
            return Err(AudiogramError::validation("an export is already running"));
        }

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let worker = {
            let busy = self.busy.clone();
            let cancel = cancel.clone();
            move || {
                let _release = ReleaseOnDrop(busy);
                run_job(&job, &cancel, &tx);
            }
        };

        // A host that cannot spawn threads still gets its export, just
        // synchronously; the buffered events read back identically.
        let join = match std::thread::Builder::new()
            .name("audiogram-export".to_string())
            .spawn(worker.clone())
        {
            Ok(join) => Some(join),
            Err(e) => {
                tracing::warn!(error = %e, "export thread spawn failed; running inline");
                worker();
                None
            }
        };

        Ok(ExportHandle {
            events: rx,
            cancel,
            join,
        })
    }
}

fn run_job(job: &ExportJob, cancel: &CancelToken, tx: &mpsc::Sender<ExportEvent>) {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(job.out_path.clone()));
    match run_with_sink(job, &mut sink, cancel, tx) {
        Ok(ExportOutcome::Done(_)) => {}
        Ok(ExportOutcome::Cancelled) => {
            let _ = tx.send(ExportEvent::State(ExportState::Cancelled));
        }
        Err(e) => {
            // A cancel request can surface as an error from whichever stage it
            // interrupted; report those as cancellation, not failure.
            if cancel.is_cancelled() {
                let _ = tx.send(ExportEvent::State(ExportState::Cancelled));
            } else {
                tracing::error!(error = %e, "export failed");
                let _ = tx.send(ExportEvent::State(ExportState::Error));
                let _ = tx.send(ExportEvent::Failed(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::amplitude::AmplitudeCurve;
    use crate::captions::CaptionTrack;
    use crate::layout::LayoutConfig;
    use crate::style::StyleConfig;

    fn scratch_dir(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        let dir = std::env::temp_dir().join(format!(
            "audiogram_{name}_{}_{nanos}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn job_with_duration(duration: f64, out_path: PathBuf) -> ExportJob {
        ExportJob {
            inputs: Arc::new(RenderInputs {
                style: StyleConfig::default(),
                layout: LayoutConfig::default(),
                captions: CaptionTrack::new(Vec::new()),
                amplitude: AmplitudeCurve::default(),
                logo: None,
                background: None,
                duration,
            }),
            audio: None,
            out_path,
            fps: Fps::TIMELINE,
            canvas: Canvas {
                width: 32,
                height: 18,
            },
            threads: None,
        }
    }

    #[test]
    fn event_feed_progress_never_walks_backwards() {
        let (tx, rx) = mpsc::channel();
        let feed = EventFeed::new(tx);
        feed.progress("a", 50.0);
        feed.progress("a", 30.0);
        feed.progress("a", 150.0);

        let percents: Vec<f64> = rx
            .try_iter()
            .map(|ev| match ev {
                ExportEvent::Progress { percent, .. } => percent,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(percents, vec![50.0, 50.0, 100.0]);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn temp_file_guard_spares_pre_existing_files() {
        let dir = scratch_dir("guard_spares");
        let kept = dir.join("kept.mp4");
        std::fs::write(&kept, b"old artifact").unwrap();

        let guard = TempFileGuard::for_attempt(&kept);
        drop(guard);
        assert!(kept.exists(), "pre-existing file must survive a failed attempt");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn temp_file_guard_removes_files_created_by_the_attempt() {
        let dir = scratch_dir("guard_removes");
        let fresh = dir.join("fresh.mp4");

        let mut guard = TempFileGuard::for_attempt(&fresh);
        std::fs::write(&fresh, b"partial output").unwrap();
        drop(guard);
        assert!(!fresh.exists(), "partial output must be cleaned up");

        guard = TempFileGuard::for_attempt(&fresh);
        std::fs::write(&fresh, b"finished output").unwrap();
        guard.disarm();
        drop(guard);
        assert!(fresh.exists(), "a disarmed guard must keep the artifact");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn default_output_path_uses_the_podcast_naming_scheme() {
        let dir = PathBuf::from("/videos");
        let path = default_output_path(&dir);
        assert_eq!(path.parent(), Some(dir.as_path()));

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("podcast-video-"), "got {name}");
        assert!(name.ends_with(".mp4"), "got {name}");
        let stamp = &name["podcast-video-".len()..name.len() - ".mp4".len()];
        assert!(stamp.parse::<u128>().is_ok(), "got {name}");
    }

    #[test]
    fn runner_refuses_to_start_while_busy() {
        let busy = BusyFlag::new();
        assert!(busy.try_acquire());

        let runner = ExportRunner::new(busy.clone());
        let err = runner
            .start(job_with_duration(1.0, PathBuf::from("/tmp/never.mp4")))
            .unwrap_err();
        assert!(err.to_string().contains("already running"), "got {err}");

        busy.release();
    }

    #[test]
    fn failed_job_releases_the_busy_flag() {
        let dir = scratch_dir("failed_job");
        let out = dir.join("out.mp4");

        let runner = ExportRunner::new(BusyFlag::new());
        // Zero duration fails validation before any encoder is spawned.
        let handle = runner.start(job_with_duration(0.0, out.clone())).unwrap();

        let events: Vec<ExportEvent> = handle.events.iter().collect();
        handle.wait();

        match events.last() {
            Some(ExportEvent::Failed(msg)) => {
                assert!(msg.contains("nothing to export"), "got {msg}")
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(events.contains(&ExportEvent::State(ExportState::Error)));
        assert!(!runner.is_busy(), "flag must be released after failure");
        assert!(!out.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
