use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::foundation::error::{CompositorError, CompositorResult};
use crate::timeline::segment::{Segment, Timeline};

/// Parsed script artifact produced by the upstream script parser.
///
/// The JSON shape is:
///
/// ```json
/// { "title": "...", "total_duration_seconds": 63.2,
///   "segments": [ { "segment_id": 1, "start_time": 0.0, "end_time": 4.5,
///                   "visual_cue": "Intro slide" } ] }
/// ```
///
/// Segments may carry `duration` instead of `end_time`, omit `start_time` (it then follows the
/// previous segment), and name an explicit visual through `asset` (or `visual` / `image`).
#[derive(Clone, Debug)]
pub struct Script {
    /// Validated timeline.
    pub timeline: Timeline,
    /// Declared `total_duration_seconds`, or the timeline's natural duration when absent.
    pub declared_duration: f64,
}

#[derive(Debug, Deserialize)]
struct ScriptDef {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    total_duration_seconds: Option<f64>,
    #[serde(default)]
    segments: Vec<SegmentDef>,
}

#[derive(Debug, Deserialize)]
struct SegmentDef {
    segment_id: u32,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    end_time: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    visual_cue: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "visual", alias = "image")]
    asset: Option<String>,
}

impl Script {
    /// Parse a script from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> CompositorResult<Self> {
        let def: ScriptDef = serde_json::from_reader(r)
            .map_err(|e| CompositorError::validation(format!("parse script JSON: {e}")))?;
        Self::from_def(def)
    }

    /// Parse a script from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CompositorResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CompositorError::configuration(format!("open script JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    fn from_def(def: ScriptDef) -> CompositorResult<Self> {
        let mut segments = Vec::with_capacity(def.segments.len());
        let mut cursor = 0.0;
        for s in def.segments {
            let start = s.start_time.unwrap_or(cursor);
            let end = match (s.end_time, s.duration) {
                (Some(end), _) => end,
                (None, Some(d)) => start + d,
                (None, None) => {
                    return Err(CompositorError::validation(format!(
                        "segment {} has neither end_time nor duration",
                        s.segment_id
                    )));
                }
            };
            cursor = end;

            if end == start {
                warn!(segment_id = s.segment_id, "dropping zero-length segment");
                continue;
            }

            let mut seg = Segment::new(s.segment_id, start, end)?;
            let label = non_empty(s.visual_cue).or_else(|| non_empty(s.title));
            if let Some(label) = label {
                seg = seg.with_label(label);
            }
            if let Some(asset) = non_empty(s.asset) {
                seg = seg.with_asset_ref(asset);
            }
            segments.push(seg);
        }

        let title = def.title.unwrap_or_else(|| "Untitled".to_string());
        let timeline = Timeline::new(title, segments)?;
        let declared_duration = match def.total_duration_seconds {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => timeline.total_duration(),
        };
        debug!(
            segments = timeline.len(),
            declared_duration, "parsed script '{}'",
            timeline.title()
        );
        Ok(Self {
            timeline,
            declared_duration,
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/script.rs"]
mod tests;
