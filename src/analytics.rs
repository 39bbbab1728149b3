use serde::Serialize;

// ==================== Statistical Analysis ====================

/// Statistical summary of a sequence of counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    /// Arithmetic mean, rounded to 2 decimal places
    pub mean: f64,
    /// Median, rounded to 2 decimal places
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Exact sum of all values
    #[serde(rename = "total")]
    pub sum: f64,
}

/// Calculate mean, median, min, max and sum.
///
/// An empty sequence is a valid input and yields all zeros.
pub fn calculate_stats(values: &[f64]) -> Summary {
    if values.is_empty() {
        return Summary::default();
    }

    let n = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / n as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    Summary {
        mean: round2(mean),
        median: round2(median),
        min: sorted[0],
        max: sorted[n - 1],
        sum,
    }
}

/// Convenience wrapper over [`calculate_stats`] for integer counts.
pub fn calculate_count_stats<I>(counts: I) -> Summary
where
    I: IntoIterator<Item = u64>,
{
    let values: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    calculate_stats(&values)
}

/// Mean of the counts rounded to 2 decimal places, zero when empty.
pub fn mean_of<I>(counts: I) -> f64
where
    I: IntoIterator<Item = u64>,
{
    let (sum, n) = counts
        .into_iter()
        .fold((0u64, 0usize), |(sum, n), c| (sum + c, n + 1));
    if n == 0 { 0.0 } else { round2(sum as f64 / n as f64) }
}

/// Infractions per hundred frames.
///
/// Zero frames gives zero: a camera that captured nothing has no rate.
pub fn efficiency(infractions: u64, frames: u64) -> f64 {
    if frames > 0 {
        infractions as f64 / frames as f64 * 100.0
    } else {
        0.0
    }
}

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
