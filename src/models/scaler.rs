//! Fitted normalization parameters

use serde::Deserialize;

/// Per-feature centering and scaling statistics fitted offline.
///
/// Position i holds the mean and scale for feature i of the serving
/// schema. Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    /// Number of features these parameters were fitted for.
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Index of the first zero or non-finite scale entry, if any.
    ///
    /// The fitting process guarantees non-zero scales; a hit here means
    /// a corrupt or mis-fitted artifact.
    pub fn degenerate_index(&self) -> Option<usize> {
        self.scale.iter().position(|s| *s == 0.0 || !s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_scaler() {
        let scaler = StandardScaler::new(vec![500.0, 15.0], vec![150.0, 5.0]);

        assert_eq!(scaler.len(), 2);
        assert_eq!(scaler.degenerate_index(), None);
    }

    #[test]
    fn test_zero_scale_detected() {
        let scaler = StandardScaler::new(vec![500.0, 15.0, 3.0], vec![150.0, 0.0, 2.0]);

        assert_eq!(scaler.degenerate_index(), Some(1));
    }

    #[test]
    fn test_non_finite_scale_detected() {
        let scaler = StandardScaler::new(vec![0.0, 0.0], vec![1.0, f64::NAN]);

        assert_eq!(scaler.degenerate_index(), Some(1));
    }
}
