use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;
use tracing::debug;

use crate::foundation::error::{CompositorError, CompositorResult};
use crate::timeline::segment::Segment;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "avi", "mkv"];

/// Whether an asset is held as a still or played as motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Still image, looped for the segment duration.
    Image,
    /// Video, trimmed to the segment duration.
    Video,
}

impl AssetKind {
    /// Classify a path by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// A visual found in the asset directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetHandle {
    /// File path.
    pub path: PathBuf,
    /// Still or motion.
    pub kind: AssetKind,
}

/// Outcome of resolving one segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// A visual matched.
    Found(AssetHandle),
    /// Nothing matched; the caller synthesizes a placeholder.
    Missing,
}

/// One filename convention binding a segment id to a file stem.
///
/// `width == 0` means the id is not zero-padded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NamingConvention {
    /// Fixed word in front of the number (may be empty).
    pub prefix: &'static str,
    /// Zero-padding width.
    pub width: usize,
}

impl NamingConvention {
    /// Lowercase stem this convention expects for `id`.
    pub fn stem_for(self, id: u32) -> String {
        format!("{}{:0width$}", self.prefix, id, width = self.width)
    }
}

/// Conventions tried in order; the first hit wins.
pub const DEFAULT_CONVENTIONS: &[NamingConvention] = &[
    NamingConvention { prefix: "segment_", width: 3 },
    NamingConvention { prefix: "segment_", width: 2 },
    NamingConvention { prefix: "segment_", width: 0 },
    NamingConvention { prefix: "segment-", width: 3 },
    NamingConvention { prefix: "segment-", width: 0 },
    NamingConvention { prefix: "segment", width: 3 },
    NamingConvention { prefix: "segment", width: 0 },
    NamingConvention { prefix: "slide_", width: 2 },
    NamingConvention { prefix: "slide_", width: 3 },
    NamingConvention { prefix: "slide_", width: 0 },
    NamingConvention { prefix: "slide-", width: 2 },
    NamingConvention { prefix: "slide-", width: 0 },
    NamingConvention { prefix: "slide", width: 2 },
    NamingConvention { prefix: "slide", width: 0 },
    NamingConvention { prefix: "", width: 3 },
    NamingConvention { prefix: "", width: 2 },
    NamingConvention { prefix: "", width: 0 },
];

/// Case-insensitive stem index of an asset directory, scanned once per run.
#[derive(Clone, Debug, Default)]
pub struct AssetIndex {
    root: PathBuf,
    by_stem: HashMap<String, AssetHandle>,
}

impl AssetIndex {
    /// Scan `dir` (non-recursively) for supported image and video files.
    ///
    /// Files are visited in name order, so when two files share a stem (`a.png`, `a.jpg`) the
    /// first in that order is kept.
    pub fn scan(dir: &Path) -> CompositorResult<Self> {
        if !dir.is_dir() {
            return Err(CompositorError::configuration(format!(
                "asset directory '{}' does not exist",
                dir.display()
            )));
        }
        let mut files = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("read asset directory '{}'", dir.display()))?;
        for entry in entries {
            let entry =
                entry.with_context(|| format!("read asset directory '{}'", dir.display()))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(Self::from_files(dir, files))
    }

    /// Build an index from an explicit file list (order matters for stem collisions).
    pub fn from_files(root: &Path, files: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut by_stem = HashMap::new();
        for path in files {
            let Some(kind) = AssetKind::from_path(&path) else {
                continue;
            };
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = stem.to_lowercase();
            if by_stem.contains_key(&key) {
                debug!(path = %path.display(), "ignoring asset with duplicate stem");
                continue;
            }
            by_stem.insert(key, AssetHandle { path, kind });
        }
        debug!(root = %root.display(), assets = by_stem.len(), "indexed assets");
        Self {
            root: root.to_path_buf(),
            by_stem,
        }
    }

    /// Directory the index was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of indexed assets.
    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    /// Return `true` when no supported file was found.
    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }

    /// Look up a stem case-insensitively.
    pub fn get(&self, stem: &str) -> Option<&AssetHandle> {
        self.by_stem.get(&stem.to_lowercase())
    }

    /// Resolve `segment` with [`DEFAULT_CONVENTIONS`].
    pub fn resolve(&self, segment: &Segment) -> Resolution {
        self.resolve_with(segment, DEFAULT_CONVENTIONS)
    }

    /// Resolve `segment`: its explicit `asset_ref` first, then each convention in order.
    pub fn resolve_with(&self, segment: &Segment, conventions: &[NamingConvention]) -> Resolution {
        if let Some(handle) = segment.asset_ref.as_deref().and_then(|r| self.by_reference(r)) {
            return Resolution::Found(handle);
        }
        conventions
            .iter()
            .find_map(|c| self.get(&c.stem_for(segment.id)))
            .map_or(Resolution::Missing, |h| Resolution::Found(h.clone()))
    }

    /// An existing file (absolute, or relative to the asset directory) is used as is; anything
    /// else is looked up by stem.
    fn by_reference(&self, reference: &str) -> Option<AssetHandle> {
        let path = Path::new(reference);
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        if candidate.is_file()
            && let Some(kind) = AssetKind::from_path(&candidate)
        {
            return Some(AssetHandle {
                path: candidate,
                kind,
            });
        }
        let stem = path.file_stem()?.to_str()?;
        self.get(stem).cloned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolver.rs"]
mod tests;
