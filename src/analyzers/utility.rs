/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a slice; `None` for empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Trailing mean over `window` values. A position is `None` until the window
/// is full or while any value inside it is missing.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|end| {
            if window == 0 || end + 1 < window {
                return None;
            }
            let slice = &values[end + 1 - window..=end];
            let present: Option<Vec<f64>> = slice.iter().copied().collect();
            present.map(|v| mean(&v))
        })
        .collect()
}

/// Incremental mean that ignores missing values.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    /// `None` when no value was ever present.
    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Incremental sum that ignores missing values.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RunningSum {
    sum: f64,
    count: usize,
}

impl RunningSum {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    /// `None` when no value was ever present, rather than a fabricated zero.
    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_rolling_mean_waits_for_full_window() {
        let values = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        assert_eq!(
            rolling_mean(&values, 3),
            vec![None, None, Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn test_rolling_mean_missing_value_poisons_window() {
        let values = [Some(1.0), None, Some(3.0), Some(5.0)];
        assert_eq!(rolling_mean(&values, 2), vec![None, None, None, Some(4.0)]);
    }

    #[test]
    fn test_running_mean_skips_missing() {
        let mut m = RunningMean::default();
        assert_eq!(m.value(), None);
        m.push(Some(10.0));
        m.push(None);
        m.push(Some(20.0));
        assert_eq!(m.value(), Some(15.0));
    }

    #[test]
    fn test_running_sum_distinguishes_missing_from_zero() {
        let mut s = RunningSum::default();
        s.push(None);
        assert_eq!(s.value(), None);
        s.push(Some(0.0));
        assert_eq!(s.value(), Some(0.0));
    }
}
