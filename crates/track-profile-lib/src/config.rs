//! Tunable parameters of the profile pipeline

use crate::{ProfileError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for profile building
///
/// Passed explicitly to every build; nothing is read from global settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileConfig {
    /// Number of filtered samples per spline knot (default 32).
    /// Higher values give a smoother, less detailed curve and a cheaper fit.
    pub points_per_knot: usize,
    /// Weight of the second-difference penalty on the spline coefficients.
    /// Zero disables smoothing beyond the knot spacing; knots without nearby
    /// samples then make the fit fail.
    pub smoothing: f64,
    /// Optional lower bound on the knot count, applied after the division by
    /// `points_per_knot`. Without it, tracks shorter than two knots fail to fit.
    pub min_knots: Option<usize>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            points_per_knot: 32,
            smoothing: 1e-3,
            min_knots: None,
        }
    }
}

impl ProfileConfig {
    /// Check that the parameters describe a usable fit
    pub fn validate(&self) -> Result<()> {
        if self.points_per_knot == 0 {
            return Err(ProfileError::InvalidConfig(
                "points_per_knot must be at least 1".to_string(),
            ));
        }
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err(ProfileError::InvalidConfig(format!(
                "smoothing must be a non-negative number, got {}",
                self.smoothing
            )));
        }
        if let Some(min_knots) = self.min_knots.filter(|&k| k < 2) {
            return Err(ProfileError::InvalidConfig(format!(
                "min_knots must be at least 2, got {min_knots}"
            )));
        }
        Ok(())
    }

    /// Number of knots used for `sample_count` filtered samples
    #[inline]
    pub fn knot_count(&self, sample_count: usize) -> usize {
        let knots = sample_count / self.points_per_knot.max(1);
        match self.min_knots {
            Some(min_knots) => knots.max(min_knots),
            None => knots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ProfileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_knot_count() {
        let config = ProfileConfig::default();
        assert_eq!(config.knot_count(96), 3);
        assert_eq!(config.knot_count(1000), 31);
        // No floor by default
        assert_eq!(config.knot_count(63), 1);
        assert_eq!(config.knot_count(10), 0);
        assert_eq!(config.knot_count(0), 0);
    }

    #[test]
    fn test_knot_floor_is_opt_in() {
        let config = ProfileConfig {
            min_knots: Some(2),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.knot_count(10), 2);
        assert_eq!(config.knot_count(96), 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_ratio = ProfileConfig {
            points_per_knot: 0,
            ..Default::default()
        };
        assert!(zero_ratio.validate().is_err());

        let negative = ProfileConfig {
            smoothing: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let nan = ProfileConfig {
            smoothing: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());

        let one_knot = ProfileConfig {
            min_knots: Some(1),
            ..Default::default()
        };
        assert!(one_knot.validate().is_err());
    }
}
