//! Conservative hourly-to-sub-hourly distribution.

/// Distribute the hourly energy over `n` sub-intervals.
///
/// The sub-interval weights follow the straight line from the current hour's rate to the next one's,
/// and are then rescaled so that they sum up to the hourly energy.
pub fn distribute_hour(current: f64, next: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![current];
    }
    if current <= 0.0 {
        return vec![0.0; n];
    }
    #[allow(clippy::cast_precision_loss)]
    let weights: Vec<f64> = (0..n)
        .map(|k| {
            let k = k as f64 / n as f64;
            current.mul_add(1.0 - k, next * k)
        })
        .collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.into_iter().map(|weight| weight * current / total).collect()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let uniform = current / n as f64;
        vec![uniform; n]
    }
}

/// Distribute a day of hourly energy, with no production after the last hour of the day.
pub fn distribute_day(hourly: &[f64; 24], n: usize) -> Vec<f64> {
    hourly
        .iter()
        .enumerate()
        .flat_map(|(hour, current)| {
            let next = hourly.get(hour + 1).copied().unwrap_or(0.0);
            distribute_hour(*current, next, n)
        })
        .collect()
}

/// Centred moving average, rescaled back to the original total.
pub fn smooth(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    if half == 0 || values.len() < 2 {
        return values.to_vec();
    }
    let smoothed: Vec<f64> = (0..values.len())
        .map(|index| {
            let neighbours = &values[index.saturating_sub(half)..(index + half + 1).min(values.len())];
            #[allow(clippy::cast_precision_loss)]
            let mean = neighbours.iter().sum::<f64>() / neighbours.len() as f64;
            mean
        })
        .collect();
    let before: f64 = values.iter().sum();
    let after: f64 = smoothed.iter().sum();
    if after > 0.0 {
        smoothed.into_iter().map(|value| value * before / after).collect()
    } else {
        smoothed
    }
}
