use std::fs::File;
use std::io::BufReader;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::EngineTimeouts;
use crate::foundation::core::OutputFormat;
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::layout::overlay::{PipPosition, PipSize};

/// Default crossfade length in seconds.
pub const DEFAULT_TRANSITION_SECS: f64 = 0.3;

/// Source whose duration the output must match, and which supplies the audio.
#[derive(Clone, Debug, PartialEq)]
pub enum Authority {
    /// Narration audio file; the visual track fills the whole frame.
    Narration {
        /// Audio file.
        audio: PathBuf,
    },
    /// Presenter video overlaid picture-in-picture.
    Presenter {
        /// A video file, or a directory of `*.mp4` parts joined in name order.
        video: PathBuf,
        /// Corner the presenter window is pinned to.
        position: PipPosition,
        /// Presenter window size.
        size: PipSize,
    },
}

impl Authority {
    /// Path of the authoritative source.
    pub fn path(&self) -> &Path {
        match self {
            Self::Narration { audio } => audio,
            Self::Presenter { video, .. } => video,
        }
    }
}

/// Everything one compositor run needs. Build with [`CompositorConfig::builder`].
#[derive(Clone, Debug)]
pub struct CompositorConfig {
    /// Authoritative duration and audio source.
    pub authority: Authority,
    /// Flat directory of slide images and clips.
    pub asset_dir: PathBuf,
    /// Script JSON.
    pub script: PathBuf,
    /// Final output file.
    pub output: PathBuf,
    /// Crossfade length in seconds; `0` means hard cuts.
    pub transition: f64,
    /// Keep only segments with ids in this range (re-based to start at 0).
    pub segment_range: Option<RangeInclusive<u32>>,
    /// Segment ids dropped before rendering.
    pub skip_segments: Vec<u32>,
    /// Rescale segment times onto the authoritative duration before rendering.
    pub sync_to_authority: bool,
    /// Keep intermediates after a successful run.
    pub keep_temp: bool,
    /// Parent directory for the per-run working directory.
    pub temp_root: Option<PathBuf>,
    /// Clip render workers.
    pub jobs: usize,
    /// Fail validation when the asset directory holds no usable file.
    pub strict_assets: bool,
    /// Output geometry, rate and fill.
    pub format: OutputFormat,
    /// Engine time budgets.
    pub timeouts: EngineTimeouts,
}

impl CompositorConfig {
    /// Start a builder with the four required inputs.
    pub fn builder(
        authority: Authority,
        asset_dir: impl Into<PathBuf>,
        script: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> CompositorConfigBuilder {
        CompositorConfigBuilder {
            cfg: Self {
                authority,
                asset_dir: asset_dir.into(),
                script: script.into(),
                output: output.into(),
                transition: DEFAULT_TRANSITION_SECS,
                segment_range: None,
                skip_segments: Vec::new(),
                sync_to_authority: false,
                keep_temp: false,
                temp_root: None,
                jobs: 1,
                strict_assets: false,
                format: OutputFormat::default(),
                timeouts: EngineTimeouts::default(),
            },
        }
    }

    /// Check option values; input files are checked when a run starts.
    pub fn validate(&self) -> CompositorResult<()> {
        if !self.transition.is_finite() || self.transition < 0.0 {
            return Err(CompositorError::configuration(format!(
                "transition must be a finite, non-negative number of seconds, got {}",
                self.transition
            )));
        }
        if let Some(range) = &self.segment_range
            && range.is_empty()
        {
            return Err(CompositorError::configuration(format!(
                "segment range {}..={} is empty",
                range.start(),
                range.end()
            )));
        }
        if self.jobs == 0 {
            return Err(CompositorError::configuration("jobs must be >= 1"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(CompositorError::configuration("output path is empty"));
        }
        self.format.validate()
    }
}

/// Chainable builder for [`CompositorConfig`].
#[derive(Clone, Debug)]
pub struct CompositorConfigBuilder {
    cfg: CompositorConfig,
}

impl CompositorConfigBuilder {
    /// Crossfade length in seconds (`0` disables transitions).
    pub fn transition(mut self, secs: f64) -> Self {
        self.cfg.transition = secs;
        self
    }

    /// Render only segments whose id lies in `range`.
    pub fn segment_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.cfg.segment_range = Some(range);
        self
    }

    /// Drop these segment ids.
    pub fn skip_segments(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.cfg.skip_segments = ids.into_iter().collect();
        self
    }

    /// Rescale the timeline onto the authoritative duration before rendering.
    pub fn sync_to_authority(mut self, on: bool) -> Self {
        self.cfg.sync_to_authority = on;
        self
    }

    /// Keep intermediates after success.
    pub fn keep_temp(mut self, on: bool) -> Self {
        self.cfg.keep_temp = on;
        self
    }

    /// Parent directory for the working directory.
    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg.temp_root = Some(dir.into());
        self
    }

    /// Number of clip render workers.
    pub fn jobs(mut self, n: usize) -> Self {
        self.cfg.jobs = n;
        self
    }

    /// Require at least one usable asset.
    pub fn strict_assets(mut self, on: bool) -> Self {
        self.cfg.strict_assets = on;
        self
    }

    /// Output format.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.cfg.format = format;
        self
    }

    /// Engine time budgets.
    pub fn timeouts(mut self, timeouts: EngineTimeouts) -> Self {
        self.cfg.timeouts = timeouts;
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> CompositorResult<CompositorConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// JSON job description: one file per episode (or part) instead of a hand-edited driver.
///
/// Exactly one of `narration` and `presenter` must be set. Relative paths resolve against the
/// job file's directory.
///
/// ```json
/// { "narration": "audio/ep3.mp3", "slides": "slides/ep3", "script": "ep3.json",
///   "output": "out/ep3_part2.mp4", "segment_range": [15, 28], "sync": true }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    /// Narration audio.
    #[serde(default, alias = "audio")]
    pub narration: Option<PathBuf>,
    /// Presenter video file or directory of parts.
    #[serde(default)]
    pub presenter: Option<PathBuf>,
    /// Presenter corner.
    #[serde(default)]
    pub pip_position: PipPosition,
    /// Presenter window size.
    #[serde(default)]
    pub pip_size: PipSize,
    /// Asset directory.
    #[serde(alias = "assets")]
    pub slides: PathBuf,
    /// Script JSON.
    pub script: PathBuf,
    /// Output file.
    pub output: PathBuf,
    /// Crossfade seconds.
    #[serde(default)]
    pub transition: Option<f64>,
    /// Inclusive `[first, last]` id range.
    #[serde(default)]
    pub segment_range: Option<(u32, u32)>,
    /// Ids to drop.
    #[serde(default)]
    pub skip_segments: Vec<u32>,
    /// Rescale onto the authoritative duration.
    #[serde(default)]
    pub sync: bool,
    /// Keep intermediates.
    #[serde(default)]
    pub keep_temp: bool,
    /// Working directory parent.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Clip workers.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Require at least one usable asset.
    #[serde(default)]
    pub strict_assets: bool,
    /// Output format override.
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Engine time budget overrides.
    #[serde(default)]
    pub timeouts: Option<EngineTimeouts>,
}

impl JobFile {
    /// Parse a job from a JSON reader. Paths are left as written.
    pub fn from_reader<R: std::io::Read>(r: R) -> CompositorResult<Self> {
        Ok(serde_json::from_reader(r)?)
    }

    /// Parse a job file and resolve its relative paths against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> CompositorResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CompositorError::configuration(format!("open job file '{}': {e}", path.display()))
        })?;
        let job = Self::from_reader(BufReader::new(f))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(job.relative_to(base))
    }

    /// Resolve every relative path against `base`.
    pub fn relative_to(mut self, base: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for p in [&mut self.narration, &mut self.presenter, &mut self.temp_dir]
            .into_iter()
            .flatten()
        {
            rebase(p);
        }
        rebase(&mut self.slides);
        rebase(&mut self.script);
        rebase(&mut self.output);
        self
    }

    /// Turn the job into a validated config.
    pub fn into_config(self) -> CompositorResult<CompositorConfig> {
        let authority = match (self.narration, self.presenter) {
            (Some(audio), None) => Authority::Narration { audio },
            (None, Some(video)) => Authority::Presenter {
                video,
                position: self.pip_position,
                size: self.pip_size,
            },
            (Some(_), Some(_)) => {
                return Err(CompositorError::configuration(
                    "job sets both 'narration' and 'presenter'; pick one",
                ));
            }
            (None, None) => {
                return Err(CompositorError::configuration(
                    "job needs either 'narration' or 'presenter'",
                ));
            }
        };

        let mut b = CompositorConfig::builder(authority, self.slides, self.script, self.output)
            .transition(self.transition.unwrap_or(DEFAULT_TRANSITION_SECS))
            .skip_segments(self.skip_segments)
            .sync_to_authority(self.sync)
            .keep_temp(self.keep_temp)
            .jobs(self.jobs.unwrap_or(1))
            .strict_assets(self.strict_assets);
        if let Some((first, last)) = self.segment_range {
            b = b.segment_range(first..=last);
        }
        if let Some(dir) = self.temp_dir {
            b = b.temp_root(dir);
        }
        if let Some(format) = self.format {
            b = b.format(format);
        }
        if let Some(timeouts) = self.timeouts {
            b = b.timeouts(timeouts);
        }
        b.build()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
