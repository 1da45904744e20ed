//! Action selection policy

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::heuristic::Strategy;
use crate::store::{ActionValueStore, SelectionMode, StateEntry, StateKey};

/// Exploration bonus for an action at `depth` with mean uncertainty
/// `uncertainty`: `scale * (depth + 2) * uncertainty`
pub fn exploration_bonus(scale: f64, depth: usize, uncertainty: f64) -> f64 {
    scale * (depth + 2) as f64 * uncertainty
}

/// Highest expected value among tried actions that may still succeed; first
/// wins ties
pub(crate) fn exploit_choice(entry: &StateEntry) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for stats in entry.actions().iter().filter(|s| s.success && s.is_tried()) {
        let value = stats.expected_value();
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((stats.action, value));
        }
    }
    best.map(|(action, _)| action)
}

/// Expected value plus exploration bonus; ties broken uniformly at random
pub(crate) fn explore_choice<R: Rng + ?Sized>(
    entry: &StateEntry,
    depth: usize,
    scale: f64,
    rng: &mut R,
) -> Option<usize> {
    let scored: Vec<(usize, f64)> = entry
        .actions()
        .iter()
        .filter(|s| s.success)
        .map(|s| {
            let score = s.expected_value() + exploration_bonus(scale, depth, s.mean_uncertainty());
            (s.action, score)
        })
        .collect();

    let top = scored
        .iter()
        .map(|&(_, score)| score)
        .fold(f64::NEG_INFINITY, f64::max);
    let tied: Vec<usize> = scored
        .iter()
        .filter(|&&(_, score)| score == top)
        .map(|&(action, _)| action)
        .collect();

    tied.choose(rng).copied()
}

/// Selection backed by the learned table, with heuristic fallbacks
#[derive(Debug, Clone, Copy)]
pub struct LearnedPolicy<'a> {
    store: &'a ActionValueStore,
    mode: SelectionMode,
}

impl<'a> LearnedPolicy<'a> {
    pub fn new(store: &'a ActionValueStore, mode: SelectionMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Next canonical action for `state`, `None` once the order is complete.
    ///
    /// Explore falls back to a uniformly random legal action when the table
    /// has nothing to offer. Exploit falls back to the nearest-unconnected
    /// heuristic; if that pick was already tried a random untried action is
    /// used instead, and once every action has been tried the nearest pick is
    /// returned anyway.
    pub fn select_next_action<R: Rng + ?Sized>(&self, state: &StateKey, rng: &mut R) -> Option<usize> {
        if state.is_complete() {
            return None;
        }
        if let Some(action) = self.store.best_action(state, self.mode, rng) {
            return Some(action);
        }

        let fallback = match self.mode {
            SelectionMode::Explore => Strategy::UniformRandom,
            SelectionMode::Exploit => Strategy::NearestUnconnected,
        };
        let picked = fallback.select_next_action(state, rng)?;
        let action = match (self.mode, self.store.lookup(state)) {
            (SelectionMode::Exploit, Some(entry)) if entry.is_tried(picked) => {
                let untried: Vec<usize> = state
                    .legal_actions()
                    .into_iter()
                    .filter(|&a| !entry.is_tried(a))
                    .collect();
                untried.choose(rng).copied().unwrap_or(picked)
            }
            _ => picked,
        };

        trace!(depth = state.depth(), action, strategy = fallback.name(), "Fallback selection");
        Some(action)
    }
}
