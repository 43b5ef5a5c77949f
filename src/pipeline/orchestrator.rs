use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context as _;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::assets::placeholder::write_placeholder_frame;
use crate::assets::resolver::{AssetIndex, AssetKind};
use crate::engine::process::CancelToken;
use crate::engine::{ClipRequest, ClipSource, ClipSpan, MediaEngine, MuxLayout, MuxRequest};
use crate::foundation::core::OutputFormat;
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::layout::overlay::{place, visual_area};
use crate::pipeline::config::{Authority, CompositorConfig};
use crate::pipeline::workdir::WorkDir;
use crate::plan::reconcile::{Reconciliation, reconcile, sync_timeline};
use crate::plan::render_plan::{PlannedClip, RenderPlan, Visual, crossfades_apply};
use crate::plan::transitions::{crossfaded_length, plan_transitions};
use crate::timeline::script::Script;
use crate::timeline::segment::Timeline;

/// States of one render, in order. [`RenderStage::Failed`] is reachable from any of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    /// Engine, inputs and options are checked.
    Validating,
    /// Segments are matched to assets or placeholders.
    ResolvingAssets,
    /// One clip per segment is rendered.
    RenderingClips,
    /// Clips are crossfaded or concatenated into one track.
    ApplyingTransitions,
    /// The track is padded or trimmed to the authoritative duration.
    ReconcilingDuration,
    /// The track is combined with the authoritative source.
    MuxingAudio,
    /// Output published.
    Done,
    /// Terminal failure.
    Failed,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::ResolvingAssets => "resolving_assets",
            Self::RenderingClips => "rendering_clips",
            Self::ApplyingTransitions => "applying_transitions",
            Self::ReconcilingDuration => "reconciling_duration",
            Self::MuxingAudio => "muxing_audio",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// How the clips were joined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// Crossfades applied as planned.
    Crossfaded,
    /// Crossfades disabled; clips joined with hard cuts.
    HardCut,
    /// The crossfade graph failed and hard cuts were used instead.
    Degraded,
    /// Only one clip; nothing to join.
    SingleClip,
}

/// Summary of a finished render.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderReport {
    /// Published output file.
    pub output: PathBuf,
    /// Episode title from the script.
    pub title: String,
    /// Segments in the (filtered) timeline.
    pub segments_planned: usize,
    /// Segments whose clip made it into the output.
    pub segments_rendered: usize,
    /// Segments rendered from a placeholder frame.
    pub placeholder_segments: Vec<u32>,
    /// Segments dropped because their clip failed.
    pub skipped_segments: Vec<u32>,
    /// How clips were joined.
    pub transitions: TransitionOutcome,
    /// Factor applied to segment times before rendering, when synced.
    pub scale_factor: Option<f64>,
    /// Measured length of the joined track.
    pub natural_duration: f64,
    /// Authoritative duration.
    pub target_duration: f64,
    /// Post-render instruction that was applied.
    pub reconciliation: Reconciliation,
    /// Working directory left on disk, if any.
    pub kept_workdir: Option<PathBuf>,
}

impl RenderReport {
    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> CompositorResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("write render report '{}'", path.display()))?;
        Ok(())
    }
}

/// Drives one render through the [`RenderStage`] sequence against a [`MediaEngine`].
#[derive(Debug)]
pub struct Compositor<E> {
    engine: E,
    cancel: CancelToken,
}

struct Prepared {
    timeline: Timeline,
    index: AssetIndex,
    authority_media: PathBuf,
    target: f64,
    scale: Option<f64>,
}

struct RenderedClips {
    spans: Vec<ClipSpan>,
    skipped: Vec<u32>,
}

struct StageLog {
    current: RenderStage,
    entered: Instant,
}

impl StageLog {
    fn start() -> Self {
        info!(stage = %RenderStage::Validating, "render started");
        Self {
            current: RenderStage::Validating,
            entered: Instant::now(),
        }
    }

    fn enter(&mut self, next: RenderStage) {
        info!(
            from = %self.current,
            to = %next,
            elapsed_ms = self.entered.elapsed().as_millis() as u64,
            "stage transition"
        );
        self.current = next;
        self.entered = Instant::now();
    }

    fn fail(&mut self, err: &CompositorError) {
        error!(stage = %self.current, error = %err, "render failed");
        self.current = RenderStage::Failed;
    }
}

impl<E: MediaEngine> Compositor<E> {
    /// Compositor driving `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            cancel: CancelToken::new(),
        }
    }

    /// Observe `token` between stages and between clips.
    ///
    /// Pass the same token to the engine so in-flight invocations are killed as well.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Engine in use.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Validate inputs and resolve assets without rendering anything.
    #[instrument(level = "debug", skip_all)]
    pub fn plan(&self, config: &CompositorConfig) -> CompositorResult<RenderPlan> {
        config.validate()?;
        let prepared = self.prepare(config, None)?;
        let mut plan = RenderPlan::build(
            &prepared.timeline,
            &prepared.index,
            config.transition,
            prepared.target,
        );
        plan.scale_factor = prepared.scale;
        Ok(plan)
    }

    /// Run a full render and publish the output at `config.output`.
    ///
    /// Nothing is written at the destination unless every fatal stage succeeded. The working
    /// directory is removed after success (unless `keep_temp`) and kept after any failure.
    #[instrument(level = "debug", skip_all, fields(output = %config.output.display()))]
    pub fn render(&self, config: &CompositorConfig) -> CompositorResult<RenderReport> {
        let mut stages = StageLog::start();
        let workdir = match config
            .validate()
            .and_then(|()| WorkDir::create(config.temp_root.as_deref(), config.keep_temp))
        {
            Ok(w) => w,
            Err(e) => {
                stages.fail(&e);
                return Err(e);
            }
        };

        match self.run(config, &workdir, &mut stages) {
            Ok(mut report) => {
                report.kept_workdir = match workdir.finish(true) {
                    Ok(kept) => kept,
                    Err(e) => {
                        warn!(error = %e, "failed to clean up working directory");
                        None
                    }
                };
                stages.enter(RenderStage::Done);
                info!(
                    output = %report.output.display(),
                    rendered = report.segments_rendered,
                    placeholders = report.placeholder_segments.len(),
                    skipped = report.skipped_segments.len(),
                    transitions = ?report.transitions,
                    "render complete"
                );
                Ok(report)
            }
            Err(e) => {
                stages.fail(&e);
                match workdir.finish(false) {
                    Ok(Some(kept)) => {
                        info!(workdir = %kept.display(), "intermediates kept for inspection")
                    }
                    Ok(None) => {}
                    Err(cleanup) => warn!(error = %cleanup, "failed to keep working directory"),
                }
                Err(e)
            }
        }
    }

    fn run(
        &self,
        config: &CompositorConfig,
        workdir: &WorkDir,
        stages: &mut StageLog,
    ) -> CompositorResult<RenderReport> {
        let prepared = self.prepare(config, Some(workdir))?;
        ensure_parent_dir(&config.output)?;
        self.check_cancel()?;

        stages.enter(RenderStage::ResolvingAssets);
        let mut plan = RenderPlan::build(
            &prepared.timeline,
            &prepared.index,
            config.transition,
            prepared.target,
        );
        plan.scale_factor = prepared.scale;
        for clip in plan.clips.iter().filter(|c| c.visual.is_placeholder()) {
            warn!(
                segment_id = clip.segment.id,
                stage = %RenderStage::ResolvingAssets,
                "no asset found, using placeholder"
            );
        }
        self.check_cancel()?;

        stages.enter(RenderStage::RenderingClips);
        let clip_format = match config.authority {
            Authority::Narration { .. } => config.format,
            Authority::Presenter { .. } => OutputFormat {
                canvas: visual_area(config.format.canvas),
                ..config.format
            },
        };
        let rendered = self.render_clips(&plan, clip_format, config.jobs, workdir)?;
        self.check_cancel()?;

        stages.enter(RenderStage::ApplyingTransitions);
        let (track, transitions) = self.join_clips(&rendered.spans, config.transition, workdir)?;
        self.check_cancel()?;

        stages.enter(RenderStage::ReconcilingDuration);
        let durations: Vec<f64> = rendered.spans.iter().map(|s| s.duration).collect();
        let expected = if transitions == TransitionOutcome::Crossfaded {
            crossfaded_length(&durations, config.transition)
        } else {
            durations.iter().sum()
        };
        let natural = match self.engine.probe_duration(&track) {
            Ok(d) if d > 0.0 => d,
            Err(CompositorError::Cancelled) => return Err(CompositorError::Cancelled),
            other => {
                debug!(result = ?other, expected, "track probe unusable, using expected length");
                expected
            }
        };
        let instruction = reconcile(natural, prepared.target);
        info!(
            natural,
            target = prepared.target,
            instruction = ?instruction,
            "duration reconciliation"
        );
        let visual = if instruction.is_none() {
            track
        } else {
            let out = workdir.file("track_reconciled.mp4");
            self.engine
                .pad_or_trim(&track, instruction, prepared.target, &out)
                .map_err(|e| fatal(e, CompositorError::reconciliation))?;
            out
        };
        self.check_cancel()?;

        stages.enter(RenderStage::MuxingAudio);
        let layout = match config.authority {
            Authority::Narration { .. } => MuxLayout::Narration,
            Authority::Presenter { position, size, .. } => MuxLayout::Presenter {
                pip: place(position, size, config.format.canvas),
                visual_height: clip_format.canvas.height,
            },
        };
        let ext = config
            .output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let staged = workdir.file(&format!("output.{ext}"));
        self.engine
            .mux(&MuxRequest {
                visual,
                authority: prepared.authority_media.clone(),
                layout,
                duration: prepared.target,
                format: config.format,
                output: staged.clone(),
            })
            .map_err(|e| fatal(e, CompositorError::mux))?;
        publish(&staged, &config.output)?;

        Ok(RenderReport {
            output: config.output.clone(),
            title: plan.title.clone(),
            segments_planned: plan.clips.len(),
            segments_rendered: rendered.spans.len(),
            placeholder_segments: plan
                .placeholder_ids()
                .into_iter()
                .filter(|id| !rendered.skipped.contains(id))
                .collect(),
            skipped_segments: rendered.skipped,
            transitions,
            scale_factor: prepared.scale,
            natural_duration: natural,
            target_duration: prepared.target,
            reconciliation: instruction,
            kept_workdir: None,
        })
    }

    /// The `Validating` stage: every check that must pass before any clip is rendered.
    fn prepare(
        &self,
        config: &CompositorConfig,
        workdir: Option<&WorkDir>,
    ) -> CompositorResult<Prepared> {
        let version = self.engine.check_available()?;
        debug!(engine = %version, "engine available");

        let script = Script::from_path(&config.script)?;
        if script.timeline.is_empty() {
            return Err(CompositorError::validation(format!(
                "script '{}' has no segments",
                config.script.display()
            )));
        }
        let index = AssetIndex::scan(&config.asset_dir)?;
        if index.is_empty() {
            if config.strict_assets {
                return Err(CompositorError::configuration(format!(
                    "asset directory '{}' holds no usable image or video",
                    config.asset_dir.display()
                )));
            }
            warn!(
                dir = %config.asset_dir.display(),
                "asset directory holds no usable files, every segment will be a placeholder"
            );
        }

        let (authority_media, target) = self.authority_duration(&config.authority, workdir)?;
        let mut timeline = select_segments(&script.timeline, config);
        if timeline.is_empty() {
            return Err(CompositorError::configuration(
                "no segments left after applying the segment range and skip list",
            ));
        }
        let mut scale = None;
        if config.sync_to_authority {
            let (synced, factor) = sync_timeline(&timeline, target)?;
            info!(scale = factor, target, "timeline synced to authoritative duration");
            timeline = synced;
            scale = Some(factor);
        }
        Ok(Prepared {
            timeline,
            index,
            authority_media,
            target,
            scale,
        })
    }

    fn authority_duration(
        &self,
        authority: &Authority,
        workdir: Option<&WorkDir>,
    ) -> CompositorResult<(PathBuf, f64)> {
        let source = authority.path();
        let media = match authority {
            Authority::Presenter { video, .. } if video.is_dir() => {
                let parts = presenter_parts(video)?;
                match workdir {
                    Some(workdir) => {
                        let joined = workdir.file("presenter.mp4");
                        info!(parts = parts.len(), "joining presenter parts");
                        self.engine.concat(&parts, &joined, true).map_err(|e| {
                            fatal(e, |m| {
                                CompositorError::configuration(format!(
                                    "join presenter parts: {m}"
                                ))
                            })
                        })?;
                        joined
                    }
                    None => {
                        let mut total = 0.0;
                        for part in &parts {
                            total += self.probe_authority(part)?;
                        }
                        return Ok((source.to_path_buf(), total));
                    }
                }
            }
            _ if source.is_file() => source.to_path_buf(),
            _ => {
                return Err(CompositorError::configuration(format!(
                    "authoritative source '{}' does not exist",
                    source.display()
                )));
            }
        };
        let duration = self.probe_authority(&media)?;
        Ok((media, duration))
    }

    fn probe_authority(&self, path: &Path) -> CompositorResult<f64> {
        let duration = self.engine.probe_duration(path).map_err(|e| {
            fatal(e, |m| {
                CompositorError::configuration(format!(
                    "cannot read duration of '{}': {m}",
                    path.display()
                ))
            })
        })?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(CompositorError::configuration(format!(
                "authoritative source '{}' has no usable duration ({duration})",
                path.display()
            )));
        }
        Ok(duration)
    }

    fn render_clips(
        &self,
        plan: &RenderPlan,
        format: OutputFormat,
        jobs: usize,
        workdir: &WorkDir,
    ) -> CompositorResult<RenderedClips> {
        let pool = build_thread_pool(jobs)?;
        let results: Vec<(u32, CompositorResult<ClipSpan>)> = pool.install(|| {
            plan.clips
                .par_iter()
                .map(|clip| (clip.segment.id, self.render_one(clip, format, workdir)))
                .collect()
        });

        let mut spans = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        let mut first_failure = None;
        for (segment_id, result) in results {
            match result {
                Ok(span) => spans.push(span),
                Err(CompositorError::Cancelled) => return Err(CompositorError::Cancelled),
                Err(e) => {
                    warn!(
                        segment_id,
                        stage = %RenderStage::RenderingClips,
                        error = %e,
                        "segment render failed, skipping segment"
                    );
                    skipped.push(segment_id);
                    first_failure.get_or_insert(e);
                }
            }
        }
        if spans.is_empty() {
            let cause = first_failure.map(|e| e.to_string()).unwrap_or_default();
            return Err(CompositorError::engine(format!(
                "no segment clip rendered successfully ({} failed): {cause}",
                skipped.len()
            )));
        }
        Ok(RenderedClips { spans, skipped })
    }

    fn render_one(
        &self,
        clip: &PlannedClip,
        format: OutputFormat,
        workdir: &WorkDir,
    ) -> CompositorResult<ClipSpan> {
        self.check_cancel()?;
        let segment_id = clip.segment.id;
        let source = match &clip.visual {
            Visual::Asset(handle) => match handle.kind {
                AssetKind::Image => ClipSource::Image(handle.path.clone()),
                AssetKind::Video => ClipSource::Video(handle.path.clone()),
            },
            Visual::Placeholder { caption } => {
                let frame = workdir.placeholder(segment_id);
                write_placeholder_frame(&frame, format.canvas, format.background)
                    .map_err(|e| CompositorError::segment_render(segment_id, e.to_string()))?;
                ClipSource::Placeholder {
                    frame,
                    caption: caption.clone(),
                }
            }
        };
        let request = ClipRequest {
            segment_id,
            source,
            duration: clip.segment.duration(),
            format,
            output: workdir.clip(segment_id),
        };
        self.engine
            .render_clip(&request)
            .map_err(|e| fatal(e, |m| CompositorError::segment_render(segment_id, m)))?;

        let duration = match self.engine.probe_duration(&request.output) {
            Ok(d) if d > 0.0 => d,
            Err(CompositorError::Cancelled) => return Err(CompositorError::Cancelled),
            other => {
                debug!(segment_id, result = ?other, "clip probe unusable, using segment duration");
                request.duration
            }
        };
        debug!(segment_id, duration, "clip rendered");
        Ok(ClipSpan {
            path: request.output,
            duration,
        })
    }

    /// The `ApplyingTransitions` stage. Returns the joined track and how it was joined.
    fn join_clips(
        &self,
        spans: &[ClipSpan],
        crossfade: f64,
        workdir: &WorkDir,
    ) -> CompositorResult<(PathBuf, TransitionOutcome)> {
        if let [only] = spans {
            return Ok((only.path.clone(), TransitionOutcome::SingleClip));
        }
        let track = workdir.file("track.mp4");
        let paths: Vec<PathBuf> = spans.iter().map(|s| s.path.clone()).collect();

        if !crossfades_apply(crossfade, spans.len()) {
            self.hard_cut(&paths, &track)?;
            return Ok((track, TransitionOutcome::HardCut));
        }

        let durations: Vec<f64> = spans.iter().map(|s| s.duration).collect();
        let offsets = plan_transitions(&durations, crossfade);
        debug!(offsets = ?offsets, crossfade, "planned transitions");
        match self.engine.crossfade(spans, &offsets, crossfade, &track) {
            Ok(()) => Ok((track, TransitionOutcome::Crossfaded)),
            Err(CompositorError::Cancelled) => Err(CompositorError::Cancelled),
            Err(e) => {
                let err = CompositorError::transition(e.to_string());
                warn!(
                    stage = %RenderStage::ApplyingTransitions,
                    error = %err,
                    "crossfade failed, falling back to hard cuts"
                );
                self.hard_cut(&paths, &track)?;
                Ok((track, TransitionOutcome::Degraded))
            }
        }
    }

    fn hard_cut(&self, clips: &[PathBuf], track: &Path) -> CompositorResult<()> {
        self.engine.concat(clips, track, true).map_err(|e| {
            fatal(e, |m| {
                CompositorError::engine(format!("hard-cut concatenation failed: {m}"))
            })
        })
    }

    fn check_cancel(&self) -> CompositorResult<()> {
        if self.cancel.is_cancelled() {
            return Err(CompositorError::Cancelled);
        }
        Ok(())
    }
}

/// Apply the skip list, then the id range; a range re-bases the first kept segment to 0.
fn select_segments(timeline: &Timeline, config: &CompositorConfig) -> Timeline {
    let kept = timeline.without(&config.skip_segments);
    let selected = match &config.segment_range {
        Some(range) => kept.filter_range(range.clone()).rebased(),
        None => kept,
    };
    debug!(
        before = timeline.len(),
        after = selected.len(),
        natural = selected.total_duration(),
        "selected segments"
    );
    selected
}

fn presenter_parts(dir: &Path) -> CompositorResult<Vec<PathBuf>> {
    let mut parts = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read presenter directory '{}'", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("read presenter directory '{}'", dir.display()))?
            .path();
        let is_mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));
        if is_mp4 && path.is_file() {
            parts.push(path);
        }
    }
    if parts.is_empty() {
        return Err(CompositorError::configuration(format!(
            "presenter directory '{}' holds no .mp4 parts",
            dir.display()
        )));
    }
    parts.sort();
    Ok(parts)
}

/// Keep cancellation as is; re-class every other failure with `wrap`.
fn fatal(err: CompositorError, wrap: impl FnOnce(String) -> CompositorError) -> CompositorError {
    match err {
        CompositorError::Cancelled => err,
        other => wrap(other.to_string()),
    }
}

fn ensure_parent_dir(path: &Path) -> CompositorResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Move the staged output into place, copying when the rename crosses filesystems.
fn publish(staged: &Path, output: &Path) -> CompositorResult<()> {
    if std::fs::rename(staged, output).is_ok() {
        return Ok(());
    }
    std::fs::copy(staged, output).map_err(|e| {
        let _ = std::fs::remove_file(output);
        CompositorError::mux(format!(
            "publish output '{}': {e}",
            output.display()
        ))
    })?;
    Ok(())
}

fn build_thread_pool(jobs: usize) -> CompositorResult<rayon::ThreadPool> {
    if jobs == 0 {
        return Err(CompositorError::configuration("jobs must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("coursereel-clip-{i}"))
        .build()
        .map_err(|e| CompositorError::engine(format!("failed to build clip worker pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
