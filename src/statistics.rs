/// A simple statistics module with utility functions over weather and result series.
use statrs::statistics::Statistics;

/// Arithmetic mean, NaN for an empty series
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().collect::<Vec<_>>().mean()
}

pub fn max(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().collect::<Vec<_>>().max()
}

/// Mean of `values` grouped by month (1-12). Months without values are `None`.
pub fn monthly_means(values: impl IntoIterator<Item = (u32, f64)>) -> [Option<f64>; 12] {
    let mut grouped: [Vec<f64>; 12] = Default::default();
    for (month, value) in values {
        if (1..=12).contains(&month) {
            grouped[month as usize - 1].push(value);
        }
    }
    grouped.map(|month| (!month.is_empty()).then(|| month.mean()))
}
