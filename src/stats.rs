//! Summary statistics over lap-time samples
//!
//! Every function returns `None` for an empty input rather than a sentinel.
//! Inputs are consumed in the order given, so equal inputs always produce
//! bit-identical outputs.

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean over the present, finite values only
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    mean(&present)
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Continuous percentile with linear interpolation between closest ranks.
///
/// Matches SQL `percentile_cont`: for `n` sorted values the fractional rank
/// is `p * (n - 1)` and the result interpolates between the two values
/// around it. `p` is clamped into `[0, 1]`.
pub fn percentile_cont(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// 50th continuous percentile
pub fn median(values: &[f64]) -> Option<f64> {
    percentile_cont(values, 0.5)
}

/// Trailing mean over up to `window` values ending at each position.
///
/// The first positions average whatever is available, so the output has the
/// same length as the input. A zero window is treated as one.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|end| {
            let slice = &values[(end + 1).saturating_sub(window)..=end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
