// Median over repeated measurements

use super::MergeError;

/// Conventional median: middle element for odd counts, mean of the two
/// central elements for even counts
///
/// # Example
/// ```
/// use suitediff::merge::median;
///
/// assert_eq!(median(&[1.0, 1.2, 1.1]).unwrap(), 1.1);
/// assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
/// ```
pub fn median(values: &[f64]) -> Result<f64, MergeError> {
    if values.is_empty() {
        return Err(MergeError::EmptySample);
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MergeError::NotANumber);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n % 2 == 1 {
        Ok(sorted[n / 2])
    } else {
        Ok((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}
