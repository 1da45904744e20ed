//! Agent configuration

use serde::{Deserialize, Serialize};

use pairq_core::{PairqError, Result};

/// Tunable parameters of the Q-learning agent.
///
/// Every field has a default so partial config files deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Number of points per problem
    pub number_of_points: usize,

    /// Coordinates are rounded to multiples of this before canonicalization
    pub rounding_unit: i64,

    /// γ applied to the bootstrapped successor value
    pub discount_factor: f64,

    /// Reward ceiling per placed point; rewards are `max * placed - measure`
    pub max_reward_per_point: f64,

    /// Samples an estimator collects before its stored value may change
    pub required_times_seen: u32,

    /// Batched values within `2 * min_change` of the stored value are discarded
    pub min_change: f64,

    /// Scale of the exploration bonus; `None` uses `max_reward_per_point`
    pub exploration_scale: Option<f64>,

    /// Fold observations made while answering solution queries
    pub learn_from_queries: bool,

    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            number_of_points: 4,
            rounding_unit: 1,
            discount_factor: 0.1,
            max_reward_per_point: 2000.0,
            required_times_seen: 2,
            min_change: 0.5,
            exploration_scale: None,
            learn_from_queries: true,
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Config for `number_of_points` points, defaults elsewhere
    pub fn with_points(number_of_points: usize) -> Self {
        Self {
            number_of_points,
            ..Self::default()
        }
    }

    pub fn exploration_scale(&self) -> f64 {
        self.exploration_scale.unwrap_or(self.max_reward_per_point)
    }

    /// Reject parameter combinations the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.number_of_points == 0 {
            return Err(PairqError::Config(
                "number_of_points must be at least 1".to_string(),
            ));
        }
        if self.rounding_unit < 1 {
            return Err(PairqError::Config(format!(
                "rounding_unit must be at least 1, got {}",
                self.rounding_unit
            )));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(PairqError::Config(format!(
                "discount_factor must be within [0, 1], got {}",
                self.discount_factor
            )));
        }
        if self.required_times_seen == 0 {
            return Err(PairqError::Config(
                "required_times_seen must be at least 1".to_string(),
            ));
        }
        if !(self.min_change.is_finite() && self.min_change >= 0.0) {
            return Err(PairqError::Config(format!(
                "min_change must be finite and not negative, got {}",
                self.min_change
            )));
        }
        if !self.max_reward_per_point.is_finite() {
            return Err(PairqError::Config(format!(
                "max_reward_per_point must be finite, got {}",
                self.max_reward_per_point
            )));
        }
        let scale = self.exploration_scale();
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(PairqError::Config(format!(
                "exploration_scale must be finite and not negative, got {scale}"
            )));
        }
        Ok(())
    }
}
