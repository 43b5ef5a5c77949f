use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{CompositorError, CompositorResult};

/// One unit of narrated content with a single associated visual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Identifier, unique within a timeline.
    pub id: u32,
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds, strictly greater than `start_time`.
    pub end_time: f64,
    /// Optional asset stem or path naming the visual explicitly.
    pub asset_ref: Option<String>,
    /// Optional text used for placeholder frames.
    pub label: Option<String>,
}

impl Segment {
    /// Create a validated segment.
    pub fn new(id: u32, start_time: f64, end_time: f64) -> CompositorResult<Self> {
        let seg = Self {
            id,
            start_time,
            end_time,
            asset_ref: None,
            label: None,
        };
        seg.validate()?;
        Ok(seg)
    }

    /// Attach an explicit asset reference.
    pub fn with_asset_ref(mut self, asset_ref: impl Into<String>) -> Self {
        self.asset_ref = Some(asset_ref.into());
        self
    }

    /// Attach a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// `end_time - start_time`.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    fn validate(&self) -> CompositorResult<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(CompositorError::validation(format!(
                "segment {} has non-finite timing",
                self.id
            )));
        }
        if self.start_time < 0.0 {
            return Err(CompositorError::validation(format!(
                "segment {} starts before 0 ({})",
                self.id, self.start_time
            )));
        }
        if self.end_time <= self.start_time {
            return Err(CompositorError::validation(format!(
                "segment {} must end after it starts ({} <= {})",
                self.id, self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

/// Ordered segments of one episode.
///
/// Timelines are values: filtering, re-basing and rescaling return a new timeline and leave the
/// receiver untouched.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Timeline {
    title: String,
    segments: Vec<Segment>,
}

impl Timeline {
    /// Build a timeline, validating every segment and sorting by start time.
    ///
    /// Ties keep their input order.
    pub fn new(title: impl Into<String>, mut segments: Vec<Segment>) -> CompositorResult<Self> {
        let mut seen = HashSet::with_capacity(segments.len());
        for seg in &segments {
            seg.validate()?;
            if !seen.insert(seg.id) {
                return Err(CompositorError::validation(format!(
                    "duplicate segment id {}",
                    seg.id
                )));
            }
        }
        segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(Self {
            title: title.into(),
            segments,
        })
    }

    /// Episode title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Segments in start-time order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Return `true` when the timeline holds no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Natural duration: the latest `end_time`, or `0.0` when empty.
    pub fn total_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.end_time)
            .fold(0.0, f64::max)
    }

    /// Keep only segments whose id lies in `range`.
    pub fn filter_range(&self, range: RangeInclusive<u32>) -> Self {
        self.retain(|s| range.contains(&s.id))
    }

    /// Drop the listed segment ids.
    pub fn without(&self, ids: &[u32]) -> Self {
        self.retain(|s| !ids.contains(&s.id))
    }

    /// Shift every segment so the first one starts at `0`.
    pub fn rebased(&self) -> Self {
        let Some(first) = self.segments.first() else {
            return self.clone();
        };
        let origin = first.start_time;
        let segments = self
            .segments
            .iter()
            .map(|s| Segment {
                start_time: s.start_time - origin,
                end_time: s.end_time - origin,
                ..s.clone()
            })
            .collect();
        Self {
            title: self.title.clone(),
            segments,
        }
    }

    /// Multiply every timestamp by `scale`.
    pub fn rescaled(&self, scale: f64) -> CompositorResult<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CompositorError::reconciliation(format!(
                "scale factor must be finite and > 0, got {scale}"
            )));
        }
        let segments = self
            .segments
            .iter()
            .map(|s| Segment {
                start_time: s.start_time * scale,
                end_time: s.end_time * scale,
                ..s.clone()
            })
            .collect();
        Ok(Self {
            title: self.title.clone(),
            segments,
        })
    }

    fn retain(&self, keep: impl Fn(&Segment) -> bool) -> Self {
        Self {
            title: self.title.clone(),
            segments: self.segments.iter().filter(|s| keep(s)).cloned().collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/segment.rs"]
mod tests;
