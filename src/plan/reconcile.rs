use serde::Serialize;

use crate::foundation::error::{CompositorError, CompositorResult};
use crate::timeline::segment::Timeline;

/// Differences below this many seconds are left alone.
pub const RECONCILE_TOLERANCE_SECS: f64 = 0.1;

/// Post-render instruction bringing a track to its authoritative length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Lengths already agree.
    None,
    /// Hold the final frame for `by` more seconds.
    Extend {
        /// Seconds to add.
        by: f64,
    },
    /// Cut `by` seconds off the tail.
    Trim {
        /// Seconds to remove.
        by: f64,
    },
}

impl Reconciliation {
    /// Signed change in seconds (`+` extends, `-` trims).
    pub fn delta(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Extend { by } => by,
            Self::Trim { by } => -by,
        }
    }

    /// Return `true` when no change is needed.
    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Compare a natural duration against the authoritative target.
pub fn reconcile(natural: f64, target: f64) -> Reconciliation {
    let diff = target - natural;
    if diff.abs() < RECONCILE_TOLERANCE_SECS {
        Reconciliation::None
    } else if diff > 0.0 {
        Reconciliation::Extend { by: diff }
    } else {
        Reconciliation::Trim { by: -diff }
    }
}

/// `target / natural`, the uniform factor that stretches a timeline onto `target`.
///
/// A non-positive natural duration leaves the factor undefined and is a configuration error.
pub fn scale_factor(natural: f64, target: f64) -> CompositorResult<f64> {
    if !natural.is_finite() || natural <= 0.0 {
        return Err(CompositorError::configuration(format!(
            "cannot derive a scale factor from natural duration {natural}"
        )));
    }
    if !target.is_finite() || target <= 0.0 {
        return Err(CompositorError::reconciliation(format!(
            "authoritative duration must be finite and > 0, got {target}"
        )));
    }
    Ok(target / natural)
}

/// Rescale `timeline` so its natural duration lands on `target`.
///
/// Returns the new timeline with the factor that was applied.
pub fn sync_timeline(timeline: &Timeline, target: f64) -> CompositorResult<(Timeline, f64)> {
    let scale = scale_factor(timeline.total_duration(), target)?;
    Ok((timeline.rescaled(scale)?, scale))
}

#[cfg(test)]
#[path = "../../tests/unit/plan/reconcile.rs"]
mod tests;
