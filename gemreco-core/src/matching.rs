//! Matching configuration and statistics.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for u/v amplitude matching.
///
/// A candidate pair scores `1 - A - position_weight * d^2` where
/// `A = |k*q_u - q_v| / (k*q_u + q_v)` is the charge asymmetry with
/// `k = charge_ratio_scale`, and `d` is how far the intersection lies outside
/// the active area in units of its propagated sigma.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchingConfig {
    /// Pairs scoring below this are rejected outright.
    pub min_score: f64,
    /// Expected ratio of v-plane to u-plane charge for the same track.
    pub charge_ratio_scale: f64,
    /// How far outside the active area (in sigma) an intersection may lie.
    pub edge_tolerance_sigmas: f64,
    /// Weight of the squared out-of-area distance in the score.
    pub position_weight: f64,
    /// Smallest |sin| of the u/v stereo angle accepted as non-parallel.
    pub min_stereo_sine: f64,
    /// Maximum number of u/v combinations scored per tracker.
    pub max_combinations: Option<usize>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_score: 0.7, // charge asymmetry up to 0.3
            charge_ratio_scale: 1.0,
            edge_tolerance_sigmas: 0.0,
            position_weight: 0.1,
            min_stereo_sine: 1.0e-3,
            max_combinations: Some(250_000),
        }
    }
}

impl MatchingConfig {
    /// Creates a new matching configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum accepted score.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Sets the expected v/u charge ratio.
    #[must_use]
    pub fn with_charge_ratio_scale(mut self, scale: f64) -> Self {
        self.charge_ratio_scale = scale;
        self
    }

    /// Sets the active area edge tolerance.
    #[must_use]
    pub fn with_edge_tolerance_sigmas(mut self, sigmas: f64) -> Self {
        self.edge_tolerance_sigmas = sigmas;
        self
    }

    /// Sets the weight of the out-of-area penalty.
    #[must_use]
    pub fn with_position_weight(mut self, weight: f64) -> Self {
        self.position_weight = weight;
        self
    }

    /// Sets the parallel-plane threshold.
    #[must_use]
    pub fn with_min_stereo_sine(mut self, sine: f64) -> Self {
        self.min_stereo_sine = sine;
        self
    }

    /// Caps the number of combinations, or removes the cap with `None`.
    #[must_use]
    pub fn with_max_combinations(mut self, limit: Option<usize>) -> Self {
        self.max_combinations = limit;
        self
    }

    /// Checks every parameter for a usable value.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for a non-finite value, a
    /// non-positive `charge_ratio_scale`, a negative edge tolerance or
    /// position weight, or a `min_stereo_sine` outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("min_score", self.min_score),
            ("charge_ratio_scale", self.charge_ratio_scale),
            ("edge_tolerance_sigmas", self.edge_tolerance_sigmas),
            ("position_weight", self.position_weight),
            ("min_stereo_sine", self.min_stereo_sine),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(Error::InvalidConfig(format!("{name} = {value} is not finite")));
        }
        if self.charge_ratio_scale <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "charge_ratio_scale = {} must be positive",
                self.charge_ratio_scale
            )));
        }
        if self.edge_tolerance_sigmas < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "edge_tolerance_sigmas = {} must not be negative",
                self.edge_tolerance_sigmas
            )));
        }
        if self.position_weight < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "position_weight = {} must not be negative",
                self.position_weight
            )));
        }
        if !(self.min_stereo_sine > 0.0 && self.min_stereo_sine <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "min_stereo_sine = {} must be in (0, 1]",
                self.min_stereo_sine
            )));
        }
        Ok(())
    }

    /// Charge asymmetry of a u/v charge pair in `[0, 1]`.
    #[inline]
    pub fn charge_asymmetry(&self, q_u: f64, q_v: f64) -> f64 {
        let scaled = q_u * self.charge_ratio_scale;
        let total = scaled + q_v;
        if total > 0.0 {
            (scaled - q_v).abs() / total
        } else {
            0.0
        }
    }
}

/// Per-tracker matching counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchingStatistics {
    pub u_hits: usize,
    pub v_hits: usize,
    /// All u/v combinations examined.
    pub combinations: usize,
    /// Combinations whose intersection fell outside the active area.
    pub outside_area: usize,
    /// Combinations whose intersection could not be solved numerically.
    pub unsolved: usize,
    /// Combinations rejected by the score threshold.
    pub below_threshold: usize,
    /// Candidates skipped because a hit was already consumed.
    pub conflicts: usize,
    /// Accepted pairs.
    pub accepted: usize,
    /// Accepted pairs dropped while building the space point.
    pub geometry_rejected: usize,
}

impl MatchingStatistics {
    /// Pairs that became GEM hits.
    pub fn built(&self) -> usize {
        self.accepted.saturating_sub(self.geometry_rejected)
    }

    /// Unmatched hits on the u plane.
    pub fn unmatched_u(&self) -> usize {
        self.u_hits.saturating_sub(self.built())
    }

    /// Unmatched hits on the v plane.
    pub fn unmatched_v(&self) -> usize {
        self.v_hits.saturating_sub(self.built())
    }

    /// Adds another tracker's counters to this one.
    pub fn merge(&mut self, other: &Self) {
        self.u_hits += other.u_hits;
        self.v_hits += other.v_hits;
        self.combinations += other.combinations;
        self.outside_area += other.outside_area;
        self.unsolved += other.unsolved;
        self.below_threshold += other.below_threshold;
        self.conflicts += other.conflicts;
        self.accepted += other.accepted;
        self.geometry_rejected += other.geometry_rejected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_config() {
        let config = MatchingConfig::new()
            .with_min_score(0.8)
            .with_charge_ratio_scale(1.2)
            .with_edge_tolerance_sigmas(3.0)
            .with_max_combinations(None);

        assert!((config.min_score - 0.8).abs() < f64::EPSILON);
        assert!((config.charge_ratio_scale - 1.2).abs() < f64::EPSILON);
        assert!((config.edge_tolerance_sigmas - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.max_combinations, None);
    }

    #[test]
    fn test_charge_asymmetry() {
        let config = MatchingConfig::default();
        assert!((config.charge_asymmetry(100.0, 100.0)).abs() < 1e-12);
        assert!((config.charge_asymmetry(100.0, 98.0) - 2.0 / 198.0).abs() < 1e-12);
        assert!((config.charge_asymmetry(0.0, 0.0)).abs() < 1e-12);
        assert!((config.charge_asymmetry(0.0, 50.0) - 1.0).abs() < 1e-12);

        let scaled = config.with_charge_ratio_scale(2.0);
        assert!(scaled.charge_asymmetry(50.0, 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchingConfig::default().validate().is_ok());
        assert!(MatchingConfig::new()
            .with_min_score(-0.5)
            .with_edge_tolerance_sigmas(3.0)
            .with_position_weight(0.0)
            .with_min_stereo_sine(1.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_config_rejects_non_finite_values() {
        let base = MatchingConfig::default();
        let broken = [
            base.clone().with_min_score(f64::NAN),
            base.clone().with_min_score(f64::NEG_INFINITY),
            base.clone().with_charge_ratio_scale(f64::NAN),
            base.clone().with_charge_ratio_scale(f64::INFINITY),
            base.clone().with_edge_tolerance_sigmas(f64::INFINITY),
            base.clone().with_position_weight(f64::NAN),
            base.with_min_stereo_sine(f64::NAN),
        ];
        for config in &broken {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_config_rejects_non_positive_charge_scale() {
        for scale in [0.0, -1.0] {
            let config = MatchingConfig::new().with_charge_ratio_scale(scale);
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_config_rejects_negative_tolerance_and_weight() {
        let tolerance = MatchingConfig::new().with_edge_tolerance_sigmas(-0.1);
        assert!(matches!(tolerance.validate(), Err(Error::InvalidConfig(_))));

        let weight = MatchingConfig::new().with_position_weight(-0.1);
        assert!(matches!(weight.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_stereo_sine_out_of_range() {
        for sine in [0.0, -1.0e-3, 1.5] {
            let config = MatchingConfig::new().with_min_stereo_sine(sine);
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_statistics_merge() {
        let mut total = MatchingStatistics::default();
        let one = MatchingStatistics {
            u_hits: 3,
            v_hits: 2,
            combinations: 6,
            accepted: 2,
            unsolved: 1,
            ..Default::default()
        };
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.combinations, 12);
        assert_eq!(total.unsolved, 2);
        assert_eq!(total.unmatched_u(), 2);
        assert_eq!(total.unmatched_v(), 0);
    }
}
