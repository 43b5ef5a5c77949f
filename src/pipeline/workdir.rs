use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::foundation::error::CompositorResult;

/// Per-run scratch directory owned by exactly one render.
///
/// Dropped without [`WorkDir::finish`] it is removed, so a panic never leaves intermediates
/// behind; `finish` decides between removing and keeping.
#[derive(Debug)]
pub(crate) struct WorkDir {
    dir: TempDir,
    keep_on_success: bool,
}

impl WorkDir {
    pub(crate) fn create(root: Option<&Path>, keep_on_success: bool) -> CompositorResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("coursereel_");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("create temp root '{}'", root.display()))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("create working directory")?;
        debug!(workdir = %dir.path().display(), "created working directory");
        Ok(Self {
            dir,
            keep_on_success,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Rendered clip for a segment.
    pub(crate) fn clip(&self, segment_id: u32) -> PathBuf {
        self.path().join(format!("segment_{segment_id:03}.mp4"))
    }

    /// Placeholder frame for a segment.
    pub(crate) fn placeholder(&self, segment_id: u32) -> PathBuf {
        self.path().join(format!("placeholder_{segment_id:03}.png"))
    }

    pub(crate) fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Remove the directory after a clean run unless asked to keep it; always keep it after a
    /// failure. Returns the kept path.
    pub(crate) fn finish(self, succeeded: bool) -> CompositorResult<Option<PathBuf>> {
        if succeeded && !self.keep_on_success {
            let path = self.dir.path().to_path_buf();
            self.dir
                .close()
                .with_context(|| format!("remove working directory '{}'", path.display()))?;
            debug!(workdir = %path.display(), "removed working directory");
            return Ok(None);
        }
        let kept = self.dir.keep();
        info!(workdir = %kept.display(), "kept intermediates");
        Ok(Some(kept))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/workdir.rs"]
mod tests;
