//! Small numeric helpers shared by the detectors
//!
//! All routines are defensive about degenerate input: empty slices yield 0,
//! standard deviations are population (N) based, and baseline sigmas are
//! floored by the caller where divide-by-zero would otherwise surface.

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0.0 for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Population variance; 0.0 for an empty slice
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64
}

/// Shannon entropy in bits over a set of category counts
///
/// Zero-count categories carry no information and are skipped, so the
/// result is always finite.
pub fn shannon_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Z-score of `current` against a baseline sample, with the baseline sigma
/// floored at `sigma_floor`
///
/// Returns 0.0 when fewer than two baseline samples exist.
pub fn baseline_z_score(current: f64, baseline: &[f64], sigma_floor: f64) -> f64 {
    if baseline.len() < 2 {
        return 0.0;
    }
    let mu = mean(baseline);
    let sigma = std_dev(baseline).max(sigma_floor);
    (current - mu) / sigma
}

/// Fraction of variance left after removing a least-squares linear trend
///
/// 0.0 means the series is fully explained by its trend, 1.0 means the
/// trend explains nothing. Values are clamped to [0, 1].
pub fn detrended_variance_ratio(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let x_mean = mean(&xs);
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(values.iter()) {
        sxy += (x - x_mean) * (y - y_mean);
        sxx += (x - x_mean) * (x - x_mean);
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = y_mean - slope * x_mean;

    let detrended: Vec<f64> = xs
        .iter()
        .zip(values.iter())
        .map(|(x, y)| y - (slope * x + intercept))
        .collect();

    let original_var = variance(values);
    let detrended_var = detrended.iter().map(|v| v * v).sum::<f64>() / n;

    (detrended_var / (original_var + 1e-6)).min(1.0)
}

/// Replace a non-finite value with 0.0
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_slices() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(shannon_entropy(&[]), 0.0);
    }

    #[test]
    fn test_uniform_entropy() {
        // Four equally likely categories carry exactly two bits
        assert!((shannon_entropy(&[5, 5, 5, 5]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_category_entropy() {
        assert_eq!(shannon_entropy(&[42]), 0.0);
    }

    #[test]
    fn test_z_score_needs_two_samples() {
        assert_eq!(baseline_z_score(10.0, &[1.0], 0.01), 0.0);
    }

    #[test]
    fn test_z_score_sigma_floor() {
        // Identical baseline values would give sigma 0; the floor kicks in
        let z = baseline_z_score(1.1, &[1.0, 1.0, 1.0], 0.01);
        assert!((z - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_detrend_removes_linear_series() {
        let values: Vec<f64> = (0..20).map(|i| 3.0 * i as f64 + 7.0).collect();
        assert!(detrended_variance_ratio(&values) < 1e-6);
    }

    proptest! {
        #[test]
        fn entropy_is_bounded_by_log2_of_categories(counts in prop::collection::vec(0usize..1000, 1..16)) {
            let h = shannon_entropy(&counts);
            let nonzero = counts.iter().filter(|&&c| c > 0).count();
            prop_assert!(h >= 0.0);
            if nonzero > 0 {
                prop_assert!(h <= (nonzero as f64).log2() + 1e-9);
            }
        }

        #[test]
        fn std_dev_is_non_negative(values in prop::collection::vec(-1e6f64..1e6, 0..64)) {
            prop_assert!(std_dev(&values) >= 0.0);
        }
    }
}
