/// A value that can be subtracted without producing a fabricated result.
pub trait Delta: Copy {
    /// `self - earlier`, `None` when it cannot be represented.
    fn delta(self, earlier: Self) -> Option<Self>;
}

impl Delta for i64 {
    fn delta(self, earlier: Self) -> Option<Self> {
        self.checked_sub(earlier)
    }
}

impl Delta for f64 {
    fn delta(self, earlier: Self) -> Option<Self> {
        Some(self - earlier)
    }
}

/// Consecutive differences of a series, aligned with the input.
///
/// `out[i] = seq[i + 1] - seq[i]`; the last element has no successor and is
/// always `None`, as is every element where either operand is missing or
/// the difference overflows.
pub fn delta_series<T: Delta>(seq: &[Option<T>]) -> Vec<Option<T>> {
    let mut out: Vec<Option<T>> = seq
        .windows(2)
        .map(|pair| pair[1]?.delta(pair[0]?))
        .collect();
    if !seq.is_empty() {
        out.push(None);
    }
    out
}

/// Smallest and biggest present delta, for jitter summaries.
pub fn delta_range(deltas: &[Option<i64>]) -> Option<(i64, i64)> {
    deltas.iter().flatten().fold(None, |range, &d| match range {
        None => Some((d, d)),
        Some((min, max)) => Some((min.min(d), max.max(d))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_series() {
        let seq = [Some(0i64), Some(40), Some(80), Some(120), Some(170)];
        let deltas = delta_series(&seq);
        assert_eq!(deltas.len(), seq.len());
        assert_eq!(deltas, vec![Some(40), Some(40), Some(40), Some(50), None]);
        for i in 0..seq.len() - 1 {
            assert_eq!(deltas[i], Some(seq[i + 1].unwrap() - seq[i].unwrap()));
        }
    }

    #[test]
    fn test_single_element() {
        assert_eq!(delta_series(&[Some(7i64)]), vec![None]);
    }

    #[test]
    fn test_empty() {
        assert!(delta_series::<i64>(&[]).is_empty());
    }

    #[test]
    fn test_missing_operands_propagate() {
        let seq = [Some(0i64), None, Some(80), Some(100)];
        assert_eq!(delta_series(&seq), vec![None, None, Some(20), None]);
    }

    #[test]
    fn test_overflowing_delta_is_missing() {
        let seq = [Some(i64::MIN), Some(i64::MAX), Some(i64::MAX - 1)];
        assert_eq!(delta_series(&seq), vec![None, Some(-1), None]);
    }

    #[test]
    fn test_float_series() {
        let deltas = delta_series(&[Some(0.5f64), Some(1.5), Some(1.0)]);
        assert_eq!(deltas, vec![Some(1.0), Some(-0.5), None]);
    }

    #[test]
    fn test_delta_range() {
        assert_eq!(delta_range(&[Some(40), None, Some(-3), Some(41)]), Some((-3, 41)));
        assert_eq!(delta_range(&[None]), None);
    }
}
