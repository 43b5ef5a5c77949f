//! coursereel turns a timed lesson script, a folder of slides and an authoritative narration
//! (or presenter video) into one rendered course video.
//!
//! The core is a segment timeline compositor:
//!
//! - Parse a [`Script`] into a [`Timeline`] and resolve each [`Segment`] against an
//!   [`AssetIndex`], falling back to placeholder frames
//! - Plan crossfade offsets ([`plan_transitions`]) and duration reconciliation ([`reconcile`])
//! - Drive a [`MediaEngine`] (the system `ffmpeg` via [`FfmpegEngine`]) through the
//!   [`RenderStage`] sequence with a [`Compositor`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod engine;
mod foundation;
mod layout;
mod pipeline;
mod plan;
mod timeline;

pub use crate::foundation::core::{Canvas, OutputFormat, Rect, Rgb8};
pub use crate::foundation::error::{CompositorError, CompositorResult};

pub use crate::timeline::script::Script;
pub use crate::timeline::segment::{Segment, Timeline};

pub use crate::assets::placeholder::{
    PLACEHOLDER_LABEL_CHARS, placeholder_caption, sanitize_caption, write_placeholder_frame,
};
pub use crate::assets::resolver::{
    AssetHandle, AssetIndex, AssetKind, DEFAULT_CONVENTIONS, NamingConvention, Resolution,
};

pub use crate::plan::reconcile::{
    RECONCILE_TOLERANCE_SECS, Reconciliation, reconcile, scale_factor, sync_timeline,
};
pub use crate::plan::render_plan::{PlannedClip, RenderPlan, Visual};
pub use crate::plan::transitions::{crossfaded_length, plan_transitions};

pub use crate::layout::overlay::{PIP_PADDING, PipPosition, PipSize, place, visual_area};

pub use crate::engine::ffmpeg::{FfmpegEngine, is_ffmpeg_on_path};
pub use crate::engine::process::CancelToken;
pub use crate::engine::{
    ClipRequest, ClipSource, ClipSpan, EngineTimeouts, MediaEngine, MuxLayout, MuxRequest,
};

pub use crate::pipeline::config::{
    Authority, CompositorConfig, CompositorConfigBuilder, DEFAULT_TRANSITION_SECS, JobFile,
};
pub use crate::pipeline::orchestrator::{
    Compositor, RenderReport, RenderStage, TransitionOutcome,
};
