use serde::Serialize;

use crate::assets::placeholder::placeholder_caption;
use crate::assets::resolver::{AssetHandle, AssetIndex, Resolution};
use crate::foundation::error::CompositorResult;
use crate::plan::reconcile::{Reconciliation, reconcile};
use crate::plan::transitions::{crossfaded_length, plan_transitions};
use crate::timeline::segment::{Segment, Timeline};

/// Where a clip's pixels come from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Visual {
    /// A file from the asset directory.
    Asset(AssetHandle),
    /// A synthesized flat frame carrying `caption`.
    Placeholder {
        /// Sanitized text drawn on the frame.
        caption: String,
    },
}

impl Visual {
    /// Return `true` for synthesized frames.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

/// One segment paired with its resolved visual.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlannedClip {
    /// Segment timing and identity.
    pub segment: Segment,
    /// Resolved visual.
    pub visual: Visual,
}

/// Timeline resolved against an asset index, with the transition and duration arithmetic
/// precomputed from segment durations.
///
/// The orchestrator recomputes offsets and reconciliation from the clips it actually rendered;
/// this is what the run is expected to look like before any engine call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderPlan {
    /// Episode title.
    pub title: String,
    /// Clips in timeline order.
    pub clips: Vec<PlannedClip>,
    /// Crossfade length in seconds (`0` disables transitions).
    pub crossfade: f64,
    /// `clips.len() - 1` offsets when crossfades are enabled, otherwise empty.
    pub transition_offsets: Vec<f64>,
    /// Expected length of the assembled visual track.
    pub natural_duration: f64,
    /// Authoritative duration from the narration or presenter source.
    pub target_duration: f64,
    /// Expected post-render instruction.
    pub reconciliation: Reconciliation,
    /// Factor already applied to segment times when the timeline was synced to the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<f64>,
}

impl RenderPlan {
    /// Resolve every segment of `timeline` and plan transitions and reconciliation.
    pub fn build(timeline: &Timeline, index: &AssetIndex, crossfade: f64, target: f64) -> Self {
        let clips: Vec<PlannedClip> = timeline
            .segments()
            .iter()
            .map(|segment| {
                let visual = match index.resolve(segment) {
                    Resolution::Found(handle) => Visual::Asset(handle),
                    Resolution::Missing => Visual::Placeholder {
                        caption: placeholder_caption(segment),
                    },
                };
                PlannedClip {
                    segment: segment.clone(),
                    visual,
                }
            })
            .collect();

        let durations: Vec<f64> = clips.iter().map(|c| c.segment.duration()).collect();
        let (transition_offsets, natural_duration) = if crossfades_apply(crossfade, durations.len())
        {
            (
                plan_transitions(&durations, crossfade),
                crossfaded_length(&durations, crossfade),
            )
        } else {
            (Vec::new(), durations.iter().sum())
        };

        Self {
            title: timeline.title().to_string(),
            clips,
            crossfade,
            transition_offsets,
            natural_duration,
            target_duration: target,
            reconciliation: reconcile(natural_duration, target),
            scale_factor: None,
        }
    }

    /// Ids of segments that will render a placeholder.
    pub fn placeholder_ids(&self) -> Vec<u32> {
        self.clips
            .iter()
            .filter(|c| c.visual.is_placeholder())
            .map(|c| c.segment.id)
            .collect()
    }

    /// Pretty JSON form used by the dry-run command.
    pub fn to_json_pretty(&self) -> CompositorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Crossfades need a positive length and at least two clips.
pub(crate) fn crossfades_apply(crossfade: f64, clips: usize) -> bool {
    crossfade > 0.0 && clips > 1
}

#[cfg(test)]
#[path = "../../tests/unit/plan/render_plan.rs"]
mod tests;
