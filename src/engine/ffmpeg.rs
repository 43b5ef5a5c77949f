use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use tracing::{debug, instrument, warn};

use crate::engine::process::{self, CancelToken, ProcessOutput};
use crate::engine::{
    ClipRequest, ClipSource, ClipSpan, EngineTimeouts, MediaEngine, MuxLayout, MuxRequest,
};
use crate::foundation::core::{Canvas, OutputFormat, Rect, Rgb8};
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::plan::reconcile::Reconciliation;

const CAPTION_FONT_SIZE: u32 = 48;
const AUDIO_BITRATE: &str = "192k";

/// Return `true` when both `ffmpeg` and `ffprobe` resolve on `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

/// [`MediaEngine`] backed by the system `ffmpeg` and `ffprobe` binaries.
///
/// The binaries are driven as child processes rather than linked, so no FFmpeg development
/// headers are needed at build time.
#[derive(Clone, Debug)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeouts: EngineTimeouts,
    cancel: CancelToken,
}

impl FfmpegEngine {
    /// Engine using explicit binary paths.
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeouts: EngineTimeouts::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Find `ffmpeg` and `ffprobe` on `PATH`.
    pub fn locate() -> CompositorResult<Self> {
        Self::locate_with(None, None)
    }

    /// Like [`FfmpegEngine::locate`], with optional overrides for either binary.
    pub fn locate_with(
        ffmpeg: Option<PathBuf>,
        ffprobe: Option<PathBuf>,
    ) -> CompositorResult<Self> {
        let find = |name: &str, explicit: Option<PathBuf>| match explicit {
            Some(path) => which::which(&path).map_err(|e| {
                CompositorError::configuration(format!(
                    "{name} binary '{}' is not executable: {e}",
                    path.display()
                ))
            }),
            None => which::which(name).map_err(|e| {
                CompositorError::configuration(format!(
                    "{name} is required but was not found on PATH: {e}"
                ))
            }),
        };
        Ok(Self::new(find("ffmpeg", ffmpeg)?, find("ffprobe", ffprobe)?))
    }

    /// Replace the per-operation time budgets.
    pub fn with_timeouts(mut self, timeouts: EngineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Share `token` so the caller can stop in-flight invocations.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token observed by every invocation of this engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Resolved `ffmpeg` binary.
    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    /// Resolved `ffprobe` binary.
    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe
    }

    fn ffmpeg(
        &self,
        args: &[String],
        operation: &str,
        timeout: Duration,
    ) -> CompositorResult<ProcessOutput> {
        process::run(&self.ffmpeg, args, operation, timeout, &self.cancel)
    }
}

impl MediaEngine for FfmpegEngine {
    fn check_available(&self) -> CompositorResult<String> {
        let version = ["-version".to_string()];
        let out = self
            .ffmpeg(&version, "ffmpeg -version", self.timeouts.probe())
            .map_err(|e| CompositorError::configuration(format!("ffmpeg is not usable: {e}")))?;
        process::run(
            &self.ffprobe,
            &version,
            "ffprobe -version",
            self.timeouts.probe(),
            &self.cancel,
        )
        .map_err(|e| CompositorError::configuration(format!("ffprobe is not usable: {e}")))?;
        let text = String::from_utf8_lossy(&out.stdout);
        Ok(text.lines().next().unwrap_or("ffmpeg").trim().to_string())
    }

    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    fn probe_duration(&self, path: &Path) -> CompositorResult<f64> {
        let out = process::run(
            &self.ffprobe,
            &probe_args(path),
            "probe",
            self.timeouts.probe(),
            &self.cancel,
        )?;
        parse_probe_duration(&out.stdout).map_err(|e| {
            CompositorError::engine(format!("probe '{}': {e}", path.display()))
        })
    }

    #[instrument(level = "debug", skip_all, fields(segment_id = request.segment_id))]
    fn render_clip(&self, request: &ClipRequest) -> CompositorResult<()> {
        let result = self.ffmpeg(
            &clip_args(request, true),
            "render clip",
            self.timeouts.clip(),
        );
        match (result, &request.source) {
            (Err(CompositorError::Engine(msg)), ClipSource::Placeholder { .. }) => {
                // Builds without a text renderer reject drawtext; keep the flat frame.
                warn!(
                    segment_id = request.segment_id,
                    error = %msg,
                    "placeholder caption failed, rendering without text"
                );
                self.ffmpeg(
                    &clip_args(request, false),
                    "render clip",
                    self.timeouts.clip(),
                )?;
                Ok(())
            }
            (result, _) => result.map(|_| ()),
        }
    }

    #[instrument(level = "debug", skip_all, fields(clips = clips.len()))]
    fn concat(&self, clips: &[PathBuf], output: &Path, stream_copy: bool) -> CompositorResult<()> {
        if clips.is_empty() {
            return Err(CompositorError::engine("concat needs at least one input"));
        }
        let list = concat_list_path(output);
        std::fs::write(&list, concat_list(clips))
            .with_context(|| format!("write concat list '{}'", list.display()))?;
        self.ffmpeg(
            &concat_args(&list, output, stream_copy),
            "concat",
            self.timeouts.transition(),
        )?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(clips = clips.len(), crossfade = crossfade))]
    fn crossfade(
        &self,
        clips: &[ClipSpan],
        offsets: &[f64],
        crossfade: f64,
        output: &Path,
    ) -> CompositorResult<()> {
        if clips.len() < 2 || offsets.len() != clips.len() - 1 {
            return Err(CompositorError::transition(format!(
                "crossfade needs n >= 2 clips and n - 1 offsets (got {} clips, {} offsets)",
                clips.len(),
                offsets.len()
            )));
        }
        self.ffmpeg(
            &crossfade_args(clips, offsets, crossfade, output),
            "crossfade",
            self.timeouts.transition(),
        )?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, input, output))]
    fn pad_or_trim(
        &self,
        input: &Path,
        instruction: Reconciliation,
        target: f64,
        output: &Path,
    ) -> CompositorResult<()> {
        self.ffmpeg(
            &pad_or_trim_args(input, instruction, target, output),
            "reconcile",
            self.timeouts.reconcile(),
        )?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(output = %request.output.display()))]
    fn mux(&self, request: &MuxRequest) -> CompositorResult<()> {
        self.ffmpeg(&mux_args(request), "mux", self.timeouts.mux())?;
        Ok(())
    }
}

/// Argument list under construction; starts with overwrite and quiet logging.
#[derive(Debug)]
struct FfmpegArgs(Vec<String>);

impl FfmpegArgs {
    fn new() -> Self {
        Self(
            ["-y", "-hide_banner", "-loglevel", "error"]
                .map(String::from)
                .to_vec(),
        )
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.0.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(args.into_iter().map(Into::into));
        self
    }

    fn input(self, path: &Path) -> Self {
        self.arg("-i").arg(path_arg(path))
    }

    fn h264(self) -> Self {
        self.args([
            "-c:v", "libx264", "-preset", "medium", "-crf", "18", "-pix_fmt", "yuv420p",
        ])
    }

    fn rate(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    fn output(self, path: &Path) -> Vec<String> {
        self.arg(path_arg(path)).0
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn secs(value: f64) -> String {
    format!("{value:.3}")
}

/// Scale into `canvas` keeping aspect, centre on `background`, square pixels, yuv420p.
pub(crate) fn letterbox_filter(canvas: Canvas, background: Rgb8) -> String {
    let (w, h) = (canvas.width, canvas.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={},setsar=1,format=yuv420p",
        background.hex()
    )
}

/// Centered white caption; `caption` must already be sanitized.
pub(crate) fn caption_filter(caption: &str) -> String {
    format!(
        "drawtext=text='{caption}':fontsize={CAPTION_FONT_SIZE}:fontcolor=white:\
         x=(w-text_w)/2:y=(h-text_h)/2"
    )
}

pub(crate) fn clip_args(request: &ClipRequest, with_caption: bool) -> Vec<String> {
    let OutputFormat {
        canvas,
        fps,
        background,
    } = request.format;
    let letterbox = letterbox_filter(canvas, background);
    let duration = secs(request.duration);

    let (input, filter, still) = match &request.source {
        ClipSource::Image(path) => (path, letterbox, true),
        ClipSource::Video(path) => (
            path,
            format!("{letterbox},tpad=stop_mode=clone:stop_duration={duration}"),
            false,
        ),
        ClipSource::Placeholder { frame, caption } => {
            let filter = if with_caption && !caption.is_empty() {
                format!("{letterbox},{}", caption_filter(caption))
            } else {
                letterbox
            };
            (frame, filter, true)
        }
    };

    let args = FfmpegArgs::new();
    let args = if still { args.args(["-loop", "1"]) } else { args };
    args.input(input)
        .arg("-t")
        .arg(duration)
        .arg("-vf")
        .arg(filter)
        .arg("-an")
        .h264()
        .rate(fps)
        .output(&request.output)
}

/// Concat-demuxer list body. Paths are made absolute since the demuxer resolves relative
/// entries against the list file's directory.
pub(crate) fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|p| {
            let abs = std::path::absolute(p).unwrap_or_else(|_| p.clone());
            format!("file '{}'\n", path_arg(&abs).replace('\'', r"'\''"))
        })
        .collect()
}

fn concat_list_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "concat".to_string());
    output.with_file_name(format!("{stem}_concat.txt"))
}

pub(crate) fn concat_args(list: &Path, output: &Path, stream_copy: bool) -> Vec<String> {
    let args = FfmpegArgs::new()
        .args(["-f", "concat", "-safe", "0"])
        .input(list);
    let args = if stream_copy {
        args.args(["-c", "copy"])
    } else {
        args.arg("-an").h264()
    };
    args.output(output)
}

/// `xfade` chain over `offsets.len() + 1` inputs ending in `[vout]`.
pub(crate) fn crossfade_graph(offsets: &[f64], crossfade: f64) -> String {
    let mut graph = Vec::with_capacity(offsets.len());
    let mut previous = "[0:v]".to_string();
    for (idx, offset) in offsets.iter().enumerate() {
        let next = idx + 1;
        let label = if next == offsets.len() {
            "[vout]".to_string()
        } else {
            format!("[x{next}]")
        };
        graph.push(format!(
            "{previous}[{next}:v]xfade=transition=fade:duration={}:offset={}{label}",
            secs(crossfade),
            secs(*offset)
        ));
        previous = label;
    }
    graph.join(";")
}

pub(crate) fn crossfade_args(
    clips: &[ClipSpan],
    offsets: &[f64],
    crossfade: f64,
    output: &Path,
) -> Vec<String> {
    clips
        .iter()
        .fold(FfmpegArgs::new(), |args, clip| args.input(&clip.path))
        .arg("-filter_complex")
        .arg(crossfade_graph(offsets, crossfade))
        .args(["-map", "[vout]", "-an"])
        .h264()
        .output(output)
}

pub(crate) fn pad_or_trim_args(
    input: &Path,
    instruction: Reconciliation,
    target: f64,
    output: &Path,
) -> Vec<String> {
    let args = FfmpegArgs::new().input(input);
    match instruction {
        Reconciliation::Extend { by } => args
            .arg("-vf")
            .arg(format!("tpad=stop_mode=clone:stop_duration={}", secs(by)))
            .arg("-t")
            .arg(secs(target))
            .arg("-an")
            .h264()
            .output(output),
        Reconciliation::Trim { .. } => args
            .arg("-t")
            .arg(secs(target))
            .args(["-c", "copy"])
            .output(output),
        Reconciliation::None => args.args(["-c", "copy"]).output(output),
    }
}

/// Background, letterboxed visual area at the top, presenter window on top of both.
pub(crate) fn presenter_graph(format: &OutputFormat, pip: Rect, visual_height: u32) -> String {
    let visual = Canvas {
        width: format.canvas.width,
        height: visual_height,
    };
    let pip_box = Canvas {
        width: pip.width,
        height: pip.height,
    };
    format!(
        "[1:v]{letterbox}[vis];[0:v][vis]overlay=0:0:shortest=0[base];\
         [2:v]{boxed}[pip];[base][pip]overlay={x}:{y}:shortest=1,format=yuv420p[vout]",
        letterbox = letterbox_filter(visual, format.background),
        boxed = letterbox_filter(pip_box, format.background),
        x = pip.x,
        y = pip.y,
    )
}

pub(crate) fn mux_args(request: &MuxRequest) -> Vec<String> {
    let duration = secs(request.duration);
    match request.layout {
        MuxLayout::Narration => FfmpegArgs::new()
            .input(&request.visual)
            .input(&request.authority)
            .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac"])
            .args(["-b:a", AUDIO_BITRATE])
            .arg("-t")
            .arg(duration)
            .args(["-shortest", "-movflags", "+faststart"])
            .output(&request.output),
        MuxLayout::Presenter { pip, visual_height } => {
            let format = &request.format;
            let color = format!(
                "color=c={}:s={}:r={}",
                format.background.hex(),
                format.canvas.size_arg(),
                format.fps
            );
            FfmpegArgs::new()
                .args(["-f", "lavfi"])
                .arg("-i")
                .arg(color)
                .input(&request.visual)
                .input(&request.authority)
                .arg("-filter_complex")
                .arg(presenter_graph(format, pip, visual_height))
                .args(["-map", "[vout]", "-map", "2:a:0"])
                .h264()
                .rate(format.fps)
                .args(["-c:a", "aac", "-b:a", AUDIO_BITRATE])
                .arg("-t")
                .arg(duration)
                .args(["-movflags", "+faststart"])
                .output(&request.output)
        }
    }
}

pub(crate) fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path_arg(path),
    ]
}

pub(crate) fn parse_probe_duration(stdout: &[u8]) -> CompositorResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(stdout)?;
    let raw = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| CompositorError::engine("ffprobe reported no container duration"))?;
    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CompositorError::engine(format!("unparseable duration '{raw}'")))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(CompositorError::engine(format!(
            "invalid duration {duration}"
        )));
    }
    debug!(duration, "probed duration");
    Ok(duration)
}

#[cfg(test)]
#[path = "../../tests/unit/engine/ffmpeg.rs"]
mod tests;
