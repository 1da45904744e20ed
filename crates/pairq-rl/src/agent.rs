//! Q-learning agent - drives learning episodes and solution queries

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use pairq_core::{Evaluator, PairqError, Problem, ProblemGenerator, Result, SizeConstraint};

use crate::canonical::{canonicalize, CanonicalProblem, Permutation};
use crate::config::AgentConfig;
use crate::heuristic::Strategy;
use crate::policy::LearnedPolicy;
use crate::store::{ActionValueStore, SelectionMode, StateKey, StoreStats};
use crate::update::{shaped_reward, Estimator, FoldOutcome, Transition, UpdateRule};

/// Result of one select → evaluate → fold step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Canonical action taken
    pub action: usize,
    pub success: bool,
    pub reward: f64,
    pub fold: Option<FoldOutcome>,
}

/// Result of one pass over a problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeOutcome {
    /// Canonical order that was built
    pub order: Vec<usize>,
    pub success: bool,
    /// Reward of the last step taken
    pub reward: f64,
}

/// An answer to a solution query, in the caller's point indices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    /// One slot per point; `None` past the point where the order failed
    pub order: Vec<Option<usize>>,
    pub success: bool,
    pub reward: f64,
}

impl Solution {
    /// The order with unused slots marked `-1`
    pub fn sentinel_order(&self) -> Vec<i64> {
        self.order
            .iter()
            .map(|slot| slot.map_or(-1, |i| i as i64))
            .collect()
    }

    /// The chosen indices, without unused slots
    pub fn chosen(&self) -> Vec<usize> {
        self.order.iter().flatten().copied().collect()
    }
}

/// Summary of a `learn` call
#[derive(Debug, Clone, Serialize)]
pub struct LearnReport {
    pub episodes: usize,
    pub successes: usize,
    pub mean_reward: f64,
    /// Success percentage in each quarter of the run
    pub quartile_success: [f64; 4],
    pub states: usize,
    pub reseen: u64,
}

impl LearnReport {
    fn from_outcomes(outcomes: &[EpisodeOutcome], store: &ActionValueStore) -> Self {
        let episodes = outcomes.len();
        let successes = outcomes.iter().filter(|o| o.success).count();
        let mean_reward = if episodes > 0 {
            outcomes.iter().map(|o| o.reward).sum::<f64>() / episodes as f64
        } else {
            0.0
        };

        let mut quartile_success = [0.0; 4];
        for (q, slot) in quartile_success.iter_mut().enumerate() {
            let start = episodes * q / 4;
            let end = episodes * (q + 1) / 4;
            if end > start {
                let wins = outcomes[start..end].iter().filter(|o| o.success).count();
                *slot = wins as f64 * 100.0 / (end - start) as f64;
            }
        }

        Self {
            episodes,
            successes,
            mean_reward,
            quartile_success,
            states: store.len(),
            reseen: store.reseen_count(),
        }
    }
}

/// Double Q-learning agent for pair-connection ordering.
///
/// Owns its action-value table exclusively. All randomness comes from one
/// seeded RNG so runs are reproducible given `AgentConfig::seed`.
pub struct QLearningAgent {
    config: AgentConfig,
    store: ActionValueStore,
    evaluator: Box<dyn Evaluator>,
    generator: Box<dyn ProblemGenerator>,
    rng: StdRng,
}

impl QLearningAgent {
    pub fn new(
        config: AgentConfig,
        evaluator: Box<dyn Evaluator>,
        generator: Box<dyn ProblemGenerator>,
    ) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let store = ActionValueStore::new(UpdateRule::from_config(&config), config.exploration_scale());

        info!(
            "Q-learning agent initialized: points={}, rounding_unit={}, evaluator={}",
            config.number_of_points,
            config.rounding_unit,
            evaluator.name()
        );

        Ok(Self {
            config,
            store,
            evaluator,
            generator,
            rng,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn store(&self) -> &ActionValueStore {
        &self.store
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    /// Visits to already-known states so far
    pub fn reseen_count(&self) -> u64 {
        self.store.reseen_count()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Learn from `episodes` freshly generated problems
    pub fn learn(&mut self, episodes: usize, constraint: SizeConstraint) -> Result<LearnReport> {
        info!("Learning started: {} episodes, {:?}", episodes, constraint);

        let mut outcomes = Vec::with_capacity(episodes);
        let mut last_decile = 0;
        for episode in 0..episodes {
            let root = self.begin_episode(constraint)?;
            outcomes.push(self.run_episode(root, SelectionMode::Explore, true));

            let decile = (episode + 1) * 10 / episodes;
            if decile > last_decile {
                last_decile = decile;
                info!(
                    "{}% complete. Problems reseen: {}",
                    decile * 10,
                    self.store.reseen_count()
                );
            }
        }

        let report = LearnReport::from_outcomes(&outcomes, &self.store);
        info!(
            "Learning finished: {}/{} successful, {} states",
            report.successes, report.episodes, report.states
        );
        Ok(report)
    }

    /// Run one learning episode on a given problem
    pub fn learn_problem(&mut self, problem: &Problem) -> Result<EpisodeOutcome> {
        let (canonical, _) = self.canonicalize(problem)?;
        let root = StateKey::root(Arc::new(canonical));
        Ok(self.run_episode(root, SelectionMode::Explore, true))
    }

    /// Best known order for `problem`, mapped back to its own indices
    pub fn get_solution(&mut self, problem: &Problem) -> Result<Solution> {
        let (canonical, permutation) = self.canonicalize(problem)?;
        let root = StateKey::root(Arc::new(canonical));
        let learn = self.config.learn_from_queries;
        let outcome = self.run_episode(root, SelectionMode::Exploit, learn);

        let mut order = vec![None; self.config.number_of_points];
        for (slot, original) in order.iter_mut().zip(permutation.to_original(&outcome.order)) {
            *slot = Some(original);
        }

        debug!(
            "Solution query: success={}, reward={:.2}",
            outcome.success, outcome.reward
        );
        Ok(Solution {
            order,
            success: outcome.success,
            reward: outcome.reward,
        })
    }

    /// Canonicalize a problem after checking its size and coordinate range
    pub fn canonicalize(&self, problem: &Problem) -> Result<(CanonicalProblem, Permutation)> {
        if problem.len() != self.config.number_of_points {
            return Err(PairqError::InvalidProblem(format!(
                "expected {} points, got {}",
                self.config.number_of_points,
                problem.len()
            )));
        }
        problem.check_coordinates()?;
        Ok(canonicalize(problem, self.config.rounding_unit))
    }

    /// Generate a valid problem and return the root state of its episode
    pub fn begin_episode(&mut self, constraint: SizeConstraint) -> Result<StateKey> {
        let problem = self
            .generator
            .generate(self.config.number_of_points, constraint, &mut self.rng)?;
        let (canonical, _) = self.canonicalize(&problem)?;
        Ok(StateKey::root(Arc::new(canonical)))
    }

    /// Select the next action for `state`, evaluate the extended order and,
    /// when `learn` is set, fold the transition into the table.
    ///
    /// Returns `None` once the state's order is complete.
    pub fn step(&mut self, state: &StateKey, mode: SelectionMode, learn: bool) -> Option<StepOutcome> {
        let strategy = Strategy::Learned(LearnedPolicy::new(&self.store, mode));
        let action = strategy.select_next_action(state, &mut self.rng)?;

        let next = state.extend(action);
        let evaluation = self.evaluator.evaluate(state.problem(), next.prefix());
        let reward = shaped_reward(
            evaluation.success,
            evaluation.measure,
            next.depth(),
            self.config.max_reward_per_point,
        );
        let transition = if evaluation.success {
            Transition::new(true, reward)
        } else {
            Transition::failed()
        };

        let fold = learn.then(|| {
            let estimator = Estimator::coin_flip(&mut self.rng);
            self.store.record_outcome(state, action, transition, estimator)
        });

        Some(StepOutcome {
            action,
            success: evaluation.success,
            reward,
            fold,
        })
    }

    fn run_episode(&mut self, root: StateKey, mode: SelectionMode, learn: bool) -> EpisodeOutcome {
        let mut state = root;
        let mut success = false;
        let mut reward = 0.0;

        while let Some(outcome) = self.step(&state, mode, learn) {
            state = state.extend(outcome.action);
            success = outcome.success;
            reward = outcome.reward;
            if !success {
                break;
            }
        }

        EpisodeOutcome {
            order: state.prefix().to_vec(),
            success,
            reward,
        }
    }
}
