use std::fmt;

/// Reduction applied per date and per variable by [`crate::WeatherCache::daily_weather`].
///
/// Reductions only see the non-null values of a group; a group without any
/// value yields no value.
#[derive(Clone, Copy)]
pub enum Aggregation {
    Mean,
    Median,
    Min,
    Max,
    Sum,
    /// Caller-supplied reduction. Receives at least one value.
    Custom(fn(&[f64]) -> f64),
}

impl Aggregation {
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let result = match self {
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Custom(f) => f(values),
        };
        Some(result)
    }
}

impl fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Mean => write!(f, "Mean"),
            Aggregation::Median => write!(f, "Median"),
            Aggregation::Min => write!(f, "Min"),
            Aggregation::Max => write!(f, "Max"),
            Aggregation::Sum => write!(f, "Sum"),
            Aggregation::Custom(_) => write!(f, "Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_reductions() {
        let v = [3.0, 1.0, 4.0, 2.0];
        assert_eq!(Aggregation::Mean.apply(&v), Some(2.5));
        assert_eq!(Aggregation::Median.apply(&v), Some(2.5));
        assert_eq!(Aggregation::Median.apply(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(Aggregation::Min.apply(&v), Some(1.0));
        assert_eq!(Aggregation::Max.apply(&v), Some(4.0));
        assert_eq!(Aggregation::Sum.apply(&v), Some(10.0));
    }

    #[test]
    fn empty_group_has_no_value() {
        assert_eq!(Aggregation::Mean.apply(&[]), None);
        assert_eq!(Aggregation::Custom(|v| v[0]).apply(&[]), None);
    }

    #[test]
    fn custom_reduction() {
        fn range(values: &[f64]) -> f64 {
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            max - min
        }
        assert_eq!(Aggregation::Custom(range).apply(&[2.0, 9.0, 4.0]), Some(7.0));
    }
}
