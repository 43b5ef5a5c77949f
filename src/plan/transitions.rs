/// Crossfade start offsets for a chain of clips.
///
/// For `n` clips this returns `n - 1` offsets. The `i`-th transition (1-based) starts at
/// `sum(durations[..i]) - crossfade * i`, clamped to `0`: each earlier crossfade has already
/// folded `crossfade` seconds of overlap into the chained track.
///
/// A single clip (or none) yields an empty plan.
pub fn plan_transitions(clip_durations: &[f64], crossfade: f64) -> Vec<f64> {
    if clip_durations.len() <= 1 {
        return Vec::new();
    }
    let mut elapsed = 0.0;
    clip_durations[..clip_durations.len() - 1]
        .iter()
        .enumerate()
        .map(|(idx, d)| {
            elapsed += d;
            let completed = (idx + 1) as f64;
            (elapsed - crossfade * completed).max(0.0)
        })
        .collect()
}

/// Length of the chained track once every crossfade has folded its overlap in.
pub fn crossfaded_length(clip_durations: &[f64], crossfade: f64) -> f64 {
    let total: f64 = clip_durations.iter().sum();
    let overlaps = clip_durations.len().saturating_sub(1) as f64;
    (total - crossfade * overlaps).max(0.0)
}

#[cfg(test)]
#[path = "../../tests/unit/plan/transitions.rs"]
mod tests;
