//! Narrow seam between the orchestrator and the external transcoding engine.
//!
//! Call sites describe *what* to produce through request types; only the engine implementation
//! turns them into command lines. Tests substitute a scripted in-process engine.

pub(crate) mod ffmpeg;
pub(crate) mod process;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{OutputFormat, Rect};
use crate::foundation::error::CompositorResult;
use crate::plan::reconcile::Reconciliation;

/// Per-operation time budgets for engine invocations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTimeouts {
    /// Duration probes and version checks, in seconds.
    pub probe_secs: u64,
    /// One segment clip.
    pub clip_secs: u64,
    /// Crossfade graph or hard-cut concatenation.
    pub transition_secs: u64,
    /// Pad or trim pass.
    pub reconcile_secs: u64,
    /// Final mux (and presenter part joining).
    pub mux_secs: u64,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            probe_secs: 30,
            clip_secs: 300,
            transition_secs: 1800,
            reconcile_secs: 1800,
            mux_secs: 3600,
        }
    }
}

impl EngineTimeouts {
    pub(crate) fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub(crate) fn clip(&self) -> Duration {
        Duration::from_secs(self.clip_secs)
    }

    pub(crate) fn transition(&self) -> Duration {
        Duration::from_secs(self.transition_secs)
    }

    pub(crate) fn reconcile(&self) -> Duration {
        Duration::from_secs(self.reconcile_secs)
    }

    pub(crate) fn mux(&self) -> Duration {
        Duration::from_secs(self.mux_secs)
    }
}

/// Pixels behind one segment clip.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipSource {
    /// Still image held for the clip duration.
    Image(PathBuf),
    /// Video trimmed to the clip duration; its last frame is held if it runs short.
    Video(PathBuf),
    /// Synthesized flat frame with a caption drawn over it.
    Placeholder {
        /// Background frame written before the render.
        frame: PathBuf,
        /// Sanitized caption text.
        caption: String,
    },
}

/// One fixed-size, fixed-rate clip to render.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipRequest {
    /// Segment the clip belongs to.
    pub segment_id: u32,
    /// Visual input.
    pub source: ClipSource,
    /// Exact clip length in seconds.
    pub duration: f64,
    /// Clip geometry, rate and letterbox fill.
    pub format: OutputFormat,
    /// Destination file.
    pub output: PathBuf,
}

/// A rendered clip with its measured length.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipSpan {
    /// Clip file.
    pub path: PathBuf,
    /// Length in seconds.
    pub duration: f64,
}

/// How the visual track is combined with the authoritative source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuxLayout {
    /// Full-frame visual track, audio from a narration file.
    Narration,
    /// Visual track in the top area with the presenter video overlaid; audio from the presenter.
    Presenter {
        /// Presenter window on the output canvas.
        pip: Rect,
        /// Height of the visual area at the top of the canvas.
        visual_height: u32,
    },
}

/// Final combination of the reconciled visual track with the authoritative source.
#[derive(Clone, Debug, PartialEq)]
pub struct MuxRequest {
    /// Reconciled visual track.
    pub visual: PathBuf,
    /// Narration audio or presenter video.
    pub authority: PathBuf,
    /// Composition layout.
    pub layout: MuxLayout,
    /// Authoritative duration; the output is cut to it.
    pub duration: f64,
    /// Output geometry and rate.
    pub format: OutputFormat,
    /// Destination file.
    pub output: PathBuf,
}

/// External transcoding engine operations used by the compositor.
///
/// Implementations must be shareable across the clip worker pool. Every call blocks until the
/// output file is complete or the invocation failed.
pub trait MediaEngine: Sync {
    /// Verify the engine can be invoked; returns a human-readable version line.
    fn check_available(&self) -> CompositorResult<String>;

    /// Container duration of a media file, in seconds.
    fn probe_duration(&self, path: &Path) -> CompositorResult<f64>;

    /// Render one segment clip.
    fn render_clip(&self, request: &ClipRequest) -> CompositorResult<()>;

    /// Join `clips` with hard cuts. `stream_copy` skips re-encoding for inputs known to share
    /// codec parameters.
    fn concat(&self, clips: &[PathBuf], output: &Path, stream_copy: bool) -> CompositorResult<()>;

    /// Chain `clips` with linear crossfades of `crossfade` seconds starting at `offsets`.
    fn crossfade(
        &self,
        clips: &[ClipSpan],
        offsets: &[f64],
        crossfade: f64,
        output: &Path,
    ) -> CompositorResult<()>;

    /// Apply a reconciliation instruction so `input` lasts `target` seconds.
    fn pad_or_trim(
        &self,
        input: &Path,
        instruction: Reconciliation,
        target: f64,
        output: &Path,
    ) -> CompositorResult<()>;

    /// Combine the visual track with the authoritative source.
    fn mux(&self, request: &MuxRequest) -> CompositorResult<()>;
}

impl<E: MediaEngine + ?Sized> MediaEngine for &E {
    fn check_available(&self) -> CompositorResult<String> {
        (**self).check_available()
    }

    fn probe_duration(&self, path: &Path) -> CompositorResult<f64> {
        (**self).probe_duration(path)
    }

    fn render_clip(&self, request: &ClipRequest) -> CompositorResult<()> {
        (**self).render_clip(request)
    }

    fn concat(&self, clips: &[PathBuf], output: &Path, stream_copy: bool) -> CompositorResult<()> {
        (**self).concat(clips, output, stream_copy)
    }

    fn crossfade(
        &self,
        clips: &[ClipSpan],
        offsets: &[f64],
        crossfade: f64,
        output: &Path,
    ) -> CompositorResult<()> {
        (**self).crossfade(clips, offsets, crossfade, output)
    }

    fn pad_or_trim(
        &self,
        input: &Path,
        instruction: Reconciliation,
        target: f64,
        output: &Path,
    ) -> CompositorResult<()> {
        (**self).pad_or_trim(input, instruction, target, output)
    }

    fn mux(&self, request: &MuxRequest) -> CompositorResult<()> {
        (**self).mux(request)
    }
}
