//! Action-value store
//!
//! Maps a canonical state (problem plus chosen prefix) to per-action double
//! Q-learning statistics. Entries are created lazily and never removed.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::trace;

use crate::canonical::CanonicalProblem;
use crate::policy;
use crate::update::{Accumulator, Estimator, FoldOutcome, Successor, Transition, UpdateRule};

/// Structural key of a state: canonical problem and the ordered prefix of
/// canonical action indices chosen so far
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    problem: Arc<CanonicalProblem>,
    prefix: Vec<usize>,
}

impl StateKey {
    /// The empty-order state of a problem
    pub fn root(problem: Arc<CanonicalProblem>) -> Self {
        Self {
            problem,
            prefix: Vec::new(),
        }
    }

    /// The state reached by choosing `action` next
    pub fn extend(&self, action: usize) -> Self {
        let mut prefix = Vec::with_capacity(self.prefix.len() + 1);
        prefix.extend_from_slice(&self.prefix);
        prefix.push(action);
        Self {
            problem: Arc::clone(&self.problem),
            prefix,
        }
    }

    pub fn problem(&self) -> &CanonicalProblem {
        &self.problem
    }

    pub fn prefix(&self) -> &[usize] {
        &self.prefix
    }

    pub fn depth(&self) -> usize {
        self.prefix.len()
    }

    /// Every point has been chosen
    pub fn is_complete(&self) -> bool {
        self.prefix.len() >= self.problem.len()
    }

    /// Unchosen action indices, ascending
    pub fn legal_actions(&self) -> Vec<usize> {
        self.problem.unchosen(&self.prefix)
    }
}

/// Statistics for one (state, action) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStats {
    pub action: usize,
    /// `false` once no continuation from this action is known to succeed
    pub success: bool,
    pub values: [f64; 2],
    pub uncertainty: [f64; 2],
    pub accumulators: [Accumulator; 2],
    /// Transitions folded for this action
    pub visits: u32,
}

impl ActionStats {
    /// Fresh, maximally uncertain statistics
    pub fn new(action: usize) -> Self {
        Self {
            action,
            success: true,
            values: [0.0; 2],
            uncertainty: [1.0; 2],
            accumulators: [Accumulator::default(); 2],
            visits: 0,
        }
    }

    /// At least one transition through this action has been folded
    pub fn is_tried(&self) -> bool {
        self.visits > 0
    }

    pub fn value(&self, estimator: Estimator) -> f64 {
        self.values[estimator.index()]
    }

    /// Mean of both estimators
    pub fn expected_value(&self) -> f64 {
        (self.values[0] + self.values[1]) / 2.0
    }

    pub fn mean_uncertainty(&self) -> f64 {
        (self.uncertainty[0] + self.uncertainty[1]) / 2.0
    }

    /// Force a dead end: zero values and uncertainty, drop pending samples
    pub fn mark_dead(&mut self) {
        self.success = false;
        self.values = [0.0; 2];
        self.uncertainty = [0.0; 2];
        self.accumulators = [Accumulator::default(); 2];
    }
}

/// All legal actions of one visited state
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    actions: Vec<ActionStats>,
}

impl StateEntry {
    fn new(legal_actions: &[usize]) -> Self {
        Self {
            actions: legal_actions.iter().map(|&a| ActionStats::new(a)).collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_actions(actions: Vec<ActionStats>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[ActionStats] {
        &self.actions
    }

    pub fn action(&self, action: usize) -> Option<&ActionStats> {
        self.actions.iter().find(|s| s.action == action)
    }

    fn action_mut(&mut self, action: usize) -> Option<&mut ActionStats> {
        self.actions.iter_mut().find(|s| s.action == action)
    }

    /// At least one action may still lead to success
    pub fn has_success(&self) -> bool {
        self.actions.iter().any(|s| s.success)
    }

    pub fn is_dead(&self, action: usize) -> bool {
        self.action(action).is_some_and(|s| !s.success)
    }

    pub fn is_tried(&self, action: usize) -> bool {
        self.action(action).is_some_and(ActionStats::is_tried)
    }
}

/// How an action is picked from a known state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Highest expected value
    Exploit,
    /// Expected value plus an uncertainty bonus, random tie-break
    Explore,
}

/// Table statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub states: usize,
    pub reseen: u64,
    pub dead_ends: usize,
}

/// The agent's state/action table
#[derive(Debug, Clone)]
pub struct ActionValueStore {
    entries: HashMap<StateKey, StateEntry>,
    rule: UpdateRule,
    exploration_scale: f64,
    reseen: u64,
}

impl ActionValueStore {
    pub fn new(rule: UpdateRule, exploration_scale: f64) -> Self {
        Self {
            entries: HashMap::new(),
            rule,
            exploration_scale,
            reseen: 0,
        }
    }

    pub fn rule(&self) -> &UpdateRule {
        &self.rule
    }

    pub fn lookup(&self, key: &StateKey) -> Option<&StateEntry> {
        self.entries.get(key)
    }

    /// Get or create the entry for `key`.
    ///
    /// Panics when `legal_actions` is empty for an incomplete state, or names
    /// an action that is already in the prefix.
    pub fn ensure(&mut self, key: &StateKey, legal_actions: &[usize]) -> &mut StateEntry {
        assert!(
            !legal_actions.is_empty() || key.is_complete(),
            "ensure called with no legal actions for incomplete state {:?}",
            key.prefix()
        );
        assert!(
            legal_actions.iter().all(|a| !key.prefix().contains(a)),
            "legal actions {:?} overlap the chosen prefix {:?}",
            legal_actions,
            key.prefix()
        );

        self.entries
            .entry(key.clone())
            .or_insert_with(|| StateEntry::new(legal_actions))
    }

    /// Best action for `key` under `mode`, or `None` for an unseen state or
    /// one whose actions are all dead ends
    pub fn best_action<R: Rng + ?Sized>(
        &self,
        key: &StateKey,
        mode: SelectionMode,
        rng: &mut R,
    ) -> Option<usize> {
        let entry = self.lookup(key)?;
        match mode {
            SelectionMode::Exploit => policy::exploit_choice(entry),
            SelectionMode::Explore => {
                policy::explore_choice(entry, key.depth(), self.exploration_scale, rng)
            }
        }
    }

    /// Fold one observed transition into the table.
    ///
    /// `estimator` is the primary estimator for this visit; the caller flips
    /// the coin. Counts a reseen visit when `key` already had an entry.
    pub fn record_outcome(
        &mut self,
        key: &StateKey,
        action: usize,
        transition: Transition,
        estimator: Estimator,
    ) -> FoldOutcome {
        let successor_key = key.extend(action);
        let successor = if successor_key.is_complete() {
            Successor::Complete
        } else {
            match self.entries.get(&successor_key) {
                Some(entry) => Successor::known(entry),
                None => Successor::Unseen,
            }
        };

        if self.entries.contains_key(key) {
            self.reseen += 1;
        }

        let legal_actions = key.legal_actions();
        assert!(
            legal_actions.contains(&action),
            "action {action} is not legal in state {:?}",
            key.prefix()
        );

        let rule = self.rule.clone();
        let entry = self.ensure(key, &legal_actions);
        let Some(stats) = entry.action_mut(action) else {
            unreachable!("entry for {:?} is missing legal action {action}", key.prefix());
        };
        stats.visits = stats.visits.saturating_add(1);
        let outcome = rule.fold(stats, estimator, transition, &successor);

        trace!(
            depth = key.depth(),
            action,
            ?estimator,
            ?outcome,
            "Folded transition"
        );
        outcome
    }

    /// Number of visits to already-known states
    pub fn reseen_count(&self) -> u64 {
        self.reseen
    }

    /// Number of distinct states
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            states: self.entries.len(),
            reseen: self.reseen,
            dead_ends: self
                .entries
                .values()
                .flat_map(|e| e.actions.iter())
                .filter(|s| !s.success)
                .count(),
        }
    }
}
