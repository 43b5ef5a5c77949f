use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use coursereel::{
    Authority, CancelToken, Compositor, CompositorConfig, DEFAULT_TRANSITION_SECS, FfmpegEngine,
    JobFile, MediaEngine as _, PipPosition, PipSize, TransitionOutcome,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "coursereel",
    version,
    about = "Composite narrated course videos",
    after_help = "Example:\n  coursereel render --audio narration.mp3 --slides slides/ \\\n    --script script.json --output lesson.mp4"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the final video (requires `ffmpeg` and `ffprobe`).
    Render(RenderArgs),
    /// Resolve assets and print the render plan as JSON without rendering.
    Plan(JobArgs),
    /// Report whether the transcoding engine is usable.
    Check(EngineArgs),
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Explicit `ffmpeg` binary instead of the one on PATH.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Explicit `ffprobe` binary instead of the one on PATH.
    #[arg(long)]
    ffprobe: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct JobArgs {
    /// JSON job file describing the inputs (replaces the input flags).
    #[arg(long, conflicts_with_all = ["audio", "presenter", "slides", "script", "output"])]
    job: Option<PathBuf>,

    /// Narration audio; its length is authoritative.
    #[arg(long, conflicts_with = "presenter")]
    audio: Option<PathBuf>,

    /// Presenter video, or a directory of `.mp4` parts, overlaid picture-in-picture.
    #[arg(long)]
    presenter: Option<PathBuf>,

    /// Presenter corner.
    #[arg(long, default_value = "bottom-right", value_parser = parse_position)]
    pip_position: PipPosition,

    /// Presenter window size.
    #[arg(long, default_value = "medium", value_parser = parse_size)]
    pip_size: PipSize,

    /// Directory of slide images and clips.
    #[arg(long)]
    slides: Option<PathBuf>,

    /// Script JSON with timed segments.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Output video path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Crossfade length in seconds (0 for hard cuts).
    #[arg(long, default_value_t = DEFAULT_TRANSITION_SECS)]
    transition: f64,

    /// Only segments with ids in FIRST..LAST (inclusive), re-based to start at 0.
    #[arg(long, value_parser = parse_range)]
    segment_range: Option<RangeInclusive<u32>>,

    /// Segment ids to drop (comma separated).
    #[arg(long, value_delimiter = ',')]
    skip: Vec<u32>,

    /// Rescale segment times onto the authoritative duration before rendering.
    #[arg(long)]
    sync: bool,

    /// Keep intermediates after a successful run.
    #[arg(long)]
    keep_temp: bool,

    /// Parent directory for the per-run working directory.
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Parallel clip renders.
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Fail when the slides directory holds no usable file.
    #[arg(long)]
    strict_assets: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Write the run report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_position(s: &str) -> Result<PipPosition, String> {
    s.parse().map_err(|e: coursereel::CompositorError| e.to_string())
}

fn parse_size(s: &str) -> Result<PipSize, String> {
    s.parse().map_err(|e: coursereel::CompositorError| e.to_string())
}

fn parse_range(s: &str) -> Result<RangeInclusive<u32>, String> {
    let (first, last) = s
        .split_once("..=")
        .or_else(|| s.split_once(".."))
        .or_else(|| s.split_once('-'))
        .ok_or_else(|| format!("expected FIRST..LAST, got '{s}'"))?;
    let first: u32 = first
        .trim()
        .parse()
        .map_err(|e| format!("bad range start '{first}': {e}"))?;
    let last: u32 = last
        .trim()
        .parse()
        .map_err(|e| format!("bad range end '{last}': {e}"))?;
    if first > last {
        return Err(format!("range {first}..{last} is empty"));
    }
    Ok(first..=last)
}

fn build_config(args: &JobArgs, output_required: bool) -> anyhow::Result<CompositorConfig> {
    let mut cfg = match &args.job {
        Some(job) => JobFile::from_path(job)?.into_config()?,
        None => {
            let authority = match (&args.audio, &args.presenter) {
                (Some(audio), None) => Authority::Narration {
                    audio: audio.clone(),
                },
                (None, Some(video)) => Authority::Presenter {
                    video: video.clone(),
                    position: args.pip_position,
                    size: args.pip_size,
                },
                _ => bail!("pass exactly one of --audio or --presenter (or --job)"),
            };
            let slides = args.slides.clone().context("--slides is required")?;
            let script = args.script.clone().context("--script is required")?;
            let output = match (&args.output, output_required) {
                (Some(o), _) => o.clone(),
                (None, false) => PathBuf::from("output.mp4"),
                (None, true) => bail!("--output is required"),
            };
            let mut b = CompositorConfig::builder(authority, slides, script, output)
                .transition(args.transition)
                .skip_segments(args.skip.iter().copied())
                .sync_to_authority(args.sync)
                .jobs(args.jobs);
            if let Some(range) = &args.segment_range {
                b = b.segment_range(range.clone());
            }
            b.build()?
        }
    };
    cfg.keep_temp |= args.keep_temp;
    cfg.strict_assets |= args.strict_assets;
    if let Some(dir) = &args.temp_dir {
        cfg.temp_root = Some(dir.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn make_engine(args: &EngineArgs, cfg: Option<&CompositorConfig>) -> anyhow::Result<FfmpegEngine> {
    let engine = FfmpegEngine::locate_with(args.ffmpeg.clone(), args.ffprobe.clone())?;
    Ok(match cfg {
        Some(cfg) => engine.with_timeouts(cfg.timeouts),
        None => engine,
    })
}

/// SIGINT/SIGTERM cancel the shared token; the running engine child is killed at its next poll.
fn install_interrupt_handler(token: CancelToken) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, cancelling render");
        token.cancel();
    })
    .context("install interrupt handler")
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args.job, true)?;
    let cancel = CancelToken::new();
    let engine = make_engine(&args.job.engine, Some(&cfg))?.with_cancel(cancel.clone());
    install_interrupt_handler(cancel.clone())?;
    let report = Compositor::new(engine).with_cancel(cancel).render(&cfg)?;

    if let Some(path) = &args.report {
        report.write_json(path)?;
    }
    if !report.placeholder_segments.is_empty() {
        eprintln!("placeholders: {:?}", report.placeholder_segments);
    }
    if !report.skipped_segments.is_empty() {
        eprintln!("skipped: {:?}", report.skipped_segments);
    }
    if report.transitions == TransitionOutcome::Degraded {
        eprintln!("transitions degraded to hard cuts");
    }
    eprintln!("wrote {}", report.output.display());
    Ok(())
}

fn cmd_plan(args: JobArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args, false)?;
    let engine = make_engine(&args.engine, Some(&cfg))?;
    let plan = Compositor::new(engine).plan(&cfg)?;
    println!("{}", plan.to_json_pretty()?);
    Ok(())
}

fn cmd_check(args: EngineArgs) -> anyhow::Result<()> {
    let engine = make_engine(&args, None)?;
    let version = engine.check_available()?;
    println!("ffmpeg:  {}", engine.ffmpeg_path().display());
    println!("ffprobe: {}", engine.ffprobe_path().display());
    println!("{version}");
    Ok(())
}
