use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use audiogram::audio::amplitude::AmplitudeCurve;
use audiogram::export::{default_output_path, flatten_premul_over_bg_to_opaque_rgba8};
use audiogram::{BusyFlag, Canvas, Compositor, ExportEvent, ExportJob, Fps, Project};

#[derive(Parser, Debug)]
#[command(name = "audiogram", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Export the full clip as an MP4 (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Timeline position in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Output MP4 path. Defaults to `podcast-video-<timestamp>.mp4` in the
    /// working directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Render worker threads. Defaults to one per core.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

/// Load a project and rebase its relative asset paths onto the document's directory,
/// so `audiogram --project demos/ep1.json` finds `demos/ep1.mp3`.
fn read_project(path: &Path) -> anyhow::Result<Project> {
    let mut project =
        Project::load(path).with_context(|| format!("load project '{}'", path.display()))?;

    let root = path.parent().unwrap_or_else(|| Path::new("."));
    rebase_into(root, project.audio.as_mut());
    rebase_into(root, project.style.logo.as_mut());
    rebase_into(root, project.style.background.image.as_mut());
    Ok(project)
}

fn rebase_into(root: &Path, path: Option<&mut PathBuf>) {
    if let Some(path) = path
        && path.is_relative()
    {
        *path = root.join(&*path);
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let project = read_project(&args.project)?;
    let inputs = project.prepare(Canvas::HD, AmplitudeCurve::DEFAULT_BUCKETS)?;

    let mut compositor = Compositor::new(Canvas::HD);
    let frame = compositor.render(&inputs, args.time)?;

    let mut rgba = vec![0u8; frame.data.len()];
    flatten_premul_over_bg_to_opaque_rgba8(&mut rgba, &frame.data, [0, 0, 0, 255])?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &rgba,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let project = read_project(&args.project)?;
    let inputs = project.prepare(Canvas::HD, AmplitudeCurve::DEFAULT_BUCKETS)?;

    let out_path = args
        .out
        .unwrap_or_else(|| default_output_path(Path::new(".")));
    let job = ExportJob {
        inputs: Arc::new(inputs),
        audio: project.audio.clone(),
        out_path,
        fps: Fps::TIMELINE,
        canvas: Canvas::HD,
        threads: args.threads,
    };

    let runner = audiogram::ExportRunner::new(BusyFlag::new());
    let handle = runner.start(job)?;

    let mut failure = None;
    let mut last_pct = -1i64;
    for ev in handle.events.iter() {
        match ev {
            ExportEvent::Progress { label, percent } => {
                let pct = percent.floor() as i64;
                if pct != last_pct {
                    last_pct = pct;
                    eprintln!("{label}... {pct}%");
                }
            }
            ExportEvent::Done(path) => eprintln!("wrote {}", path.display()),
            ExportEvent::Failed(msg) => failure = Some(msg),
            ExportEvent::State(_) => {}
        }
    }
    handle.wait();

    if let Some(msg) = failure {
        anyhow::bail!("export failed: {msg}");
    }
    Ok(())
}
