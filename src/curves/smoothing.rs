//! Centered moving-average smoothing over an ordered series

/// Centered rolling mean with a shrinking window at the edges
///
/// The window around position `i` spans `i - window/2 ..= i + (window-1)/2`, clipped
/// to the series; at least one sample is always averaged. An even window takes its
/// extra sample from the earlier side. A window of 0 or 1 returns the input unchanged.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 {
        return values.to_vec();
    }

    let n = values.len();
    let before = window / 2;
    let after = (window - 1) / 2;

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after).min(n.saturating_sub(1));
            let slice = &values[start..=end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
