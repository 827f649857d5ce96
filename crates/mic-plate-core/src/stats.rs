//! Small robust statistics over `f32` samples.

/// Median of the samples, `None` if empty. NaNs sort last.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some(0.5 * (v[mid - 1] + v[mid]))
    } else {
        Some(v[mid])
    }
}

/// Arithmetic mean, `None` if empty.
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some((sum / values.len() as f64) as f32)
}

/// Population standard deviation divided by the mean.
///
/// `None` for fewer than two samples or a mean too close to zero.
pub fn coefficient_of_variation(values: &[f32]) -> Option<f32> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)? as f64;
    if m.abs() < 1e-9 {
        return None;
    }
    let var = values
        .iter()
        .map(|&v| (v as f64 - m).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    Some((var.sqrt() / m.abs()) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn median_handles_odd_and_even() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn cv_of_constant_is_zero() {
        assert_abs_diff_eq!(coefficient_of_variation(&[5.0; 4]).unwrap_or(1.0), 0.0);
        assert_eq!(coefficient_of_variation(&[5.0]), None);
        let cv = coefficient_of_variation(&[90.0, 110.0]).unwrap_or(0.0);
        assert_abs_diff_eq!(cv, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean(&[]), None);
        assert_abs_diff_eq!(mean(&[1.0, 2.0, 6.0]).unwrap_or(0.0), 3.0);
    }
}
