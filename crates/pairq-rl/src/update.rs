//! Double Q-learning update rule
//!
//! Each (state, action) pair carries two estimators. Per visit one of them is
//! primary: it chooses the greedy successor action by its own values while the
//! other estimator supplies that action's value for the bootstrap. Samples are
//! batched per estimator and only replace the stored value once
//! `required_times_seen` of them have accumulated and their mean moved far
//! enough from the current value.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::store::{ActionStats, StateEntry};

/// One of the two independent value estimators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Estimator {
    First,
    Second,
}

impl Estimator {
    pub fn index(self) -> usize {
        match self {
            Estimator::First => 0,
            Estimator::Second => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Estimator::First => Estimator::Second,
            Estimator::Second => Estimator::First,
        }
    }

    /// Fair coin choice of the primary estimator
    pub fn coin_flip<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Estimator::First
        } else {
            Estimator::Second
        }
    }
}

/// Running sum of samples awaiting a flush
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    pub sum: f64,
    pub count: u32,
}

impl Accumulator {
    pub fn push(&mut self, sample: f64) {
        self.sum += sample;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Observed result of taking an action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub success: bool,
    pub reward: f64,
}

impl Transition {
    pub fn new(success: bool, reward: f64) -> Self {
        Self { success, reward }
    }

    /// Unsuccessful transitions always carry zero reward
    pub fn failed() -> Self {
        Self {
            success: false,
            reward: 0.0,
        }
    }
}

/// Reward on the inverted scale: `max_reward_per_point * placed - measure`
/// for a successful placement, `0` otherwise
pub fn shaped_reward(success: bool, measure: f64, placed: usize, max_reward_per_point: f64) -> f64 {
    if success {
        max_reward_per_point * placed as f64 - measure
    } else {
        0.0
    }
}

/// Snapshot of a known successor state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuccessorSummary {
    pub any_success: bool,
    /// Indexed by primary estimator: the other estimator's value of the
    /// primary's greedy successor action
    pub cross_value: [f64; 2],
    /// Indexed by estimator: mean uncertainty over all successor actions
    pub mean_uncertainty: [f64; 2],
}

/// What is known about the state an action leads to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Successor {
    /// The action completed the problem
    Complete,
    /// Never visited
    Unseen,
    Known(SuccessorSummary),
}

impl Successor {
    pub fn known(entry: &StateEntry) -> Self {
        let actions = entry.actions();
        let cross_value = |primary: Estimator| {
            actions
                .iter()
                .filter(|s| s.success)
                .fold(None::<&ActionStats>, |best, s| match best {
                    Some(b) if b.value(primary) >= s.value(primary) => Some(b),
                    _ => Some(s),
                })
                .map_or(0.0, |greedy| greedy.value(primary.other()))
        };
        let mean_uncertainty = |estimator: Estimator| {
            if actions.is_empty() {
                0.0
            } else {
                actions
                    .iter()
                    .map(|s| s.uncertainty[estimator.index()])
                    .sum::<f64>()
                    / actions.len() as f64
            }
        };

        Successor::Known(SuccessorSummary {
            any_success: entry.has_success(),
            cross_value: [cross_value(Estimator::First), cross_value(Estimator::Second)],
            mean_uncertainty: [
                mean_uncertainty(Estimator::First),
                mean_uncertainty(Estimator::Second),
            ],
        })
    }

    /// No action from the successor can still succeed
    pub fn is_dead_end(&self) -> bool {
        matches!(self, Successor::Known(s) if !s.any_success)
    }

    fn bootstrap(&self, primary: Estimator) -> f64 {
        match self {
            Successor::Known(s) => s.cross_value[primary.index()],
            Successor::Complete | Successor::Unseen => 0.0,
        }
    }

    fn uncertainty(&self, estimator: Estimator) -> f64 {
        match self {
            Successor::Complete => 0.0,
            Successor::Unseen => 1.0,
            Successor::Known(s) => s.mean_uncertainty[estimator.index()],
        }
    }
}

/// What a fold did to the statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FoldOutcome {
    /// Forced to a dead end
    Failed,
    /// Sample stored, no flush yet
    Accumulated { pending: u32 },
    /// Batch flushed; `updated` tells whether the stored value changed
    Flushed { updated: bool, value: f64 },
}

/// Parameters of the batched double Q-learning update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRule {
    pub discount_factor: f64,
    pub required_times_seen: u32,
    pub min_change: f64,
}

impl UpdateRule {
    pub fn new(discount_factor: f64, required_times_seen: u32, min_change: f64) -> Self {
        Self {
            discount_factor,
            required_times_seen: required_times_seen.max(1),
            min_change,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.discount_factor,
            config.required_times_seen,
            config.min_change,
        )
    }

    /// Fold one transition into `stats` using `primary` as this visit's
    /// estimator
    pub fn fold(
        &self,
        stats: &mut ActionStats,
        primary: Estimator,
        transition: Transition,
        successor: &Successor,
    ) -> FoldOutcome {
        if !transition.success || successor.is_dead_end() {
            stats.mark_dead();
            return FoldOutcome::Failed;
        }

        stats.success = true;
        let i = primary.index();
        let sample = transition.reward + self.discount_factor * successor.bootstrap(primary);

        let accumulator = &mut stats.accumulators[i];
        accumulator.push(sample);
        if accumulator.count < self.required_times_seen {
            return FoldOutcome::Accumulated {
                pending: accumulator.count,
            };
        }

        let proposed = accumulator.mean().unwrap_or(stats.values[i]);
        accumulator.reset();

        let updated = (proposed - stats.values[i]).abs() >= 2.0 * self.min_change;
        if updated {
            stats.values[i] = proposed;
        }
        stats.uncertainty[i] = successor.uncertainty(primary);

        FoldOutcome::Flushed {
            updated,
            value: stats.values[i],
        }
    }
}
