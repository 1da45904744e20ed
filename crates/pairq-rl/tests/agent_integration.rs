//! Integration tests for the Q-learning agent
//!
//! These tests exercise canonicalization, the action-value store and the
//! learning driver together.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::float_cmp)]

use std::sync::Arc;

use pairq_core::{
    Evaluation, Point, Problem, ProblemGenerator, RandomProblemGenerator, Result, SegmentEvaluator,
    SizeConstraint,
};
use pairq_rl::{
    canonicalize, ActionValueStore, AgentConfig, Estimator, QLearningAgent, SelectionMode,
    StateKey, Transition, UpdateRule,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Always hands out the same problem
struct FixedGenerator(Problem);

impl ProblemGenerator for FixedGenerator {
    fn generate(&self, _: usize, _: SizeConstraint, _: &mut StdRng) -> Result<Problem> {
        Ok(self.0.clone())
    }
}

/// Every order succeeds; the measure is the total span of the placed points
fn distance_evaluator(problem: &Problem, order: &[usize]) -> Evaluation {
    let measure = order.iter().map(|&i| problem[i].span()).sum();
    Evaluation::new(order.to_vec(), true, measure)
}

fn three_points() -> Problem {
    Problem::new(vec![
        Point::new(452, 524, 1548, 488),
        Point::new(481, 566, 1461, 474),
        Point::new(568, 411, 1493, 538),
    ])
}

fn random_problems(count: usize, points: usize, seed: u64) -> Vec<Problem> {
    let mut rng = StdRng::seed_from_u64(seed);
    let generator = RandomProblemGenerator::new();
    (0..count)
        .map(|_| {
            generator
                .generate(points, SizeConstraint::Unconstrained, &mut rng)
                .unwrap()
        })
        .collect()
}

/// Test canonicalization is deterministic and idempotent
#[test]
fn test_canonicalization_idempotent() {
    for problem in random_problems(20, 5, 1) {
        for unit in [1, 2, 5, 10, 25] {
            let (canonical, permutation) = canonicalize(&problem, unit);
            let (again, _) = canonicalize(&problem, unit);
            assert_eq!(canonical, again, "canonicalize must be deterministic");

            let (twice, identity) = canonicalize(canonical.as_problem(), unit);
            assert_eq!(twice, canonical, "canonicalize must be idempotent");
            assert_eq!(identity.as_slice(), &[0, 1, 2, 3, 4]);
            assert_eq!(permutation.len(), 5);
        }
    }
}

/// Test every canonical order maps back to a valid order over original indices
#[test]
fn test_permutation_round_trip() {
    let problem = random_problems(1, 4, 2).remove(0);
    let (canonical, permutation) = canonicalize(&problem, 1);

    let mut order = vec![0, 1, 2, 3];
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..30 {
        order.shuffle(&mut rng);
        let original = permutation.to_original(&order);

        let mut sorted = original.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);

        for (&slot, &index) in order.iter().zip(&original) {
            assert_eq!(canonical[slot], problem[index]);
        }
    }
}

/// Test the table only grows and reseen counts exactly one per known-state visit
#[test]
fn test_monotonic_growth_and_reseen_counting() {
    let config = AgentConfig {
        number_of_points: 4,
        seed: Some(5),
        ..AgentConfig::default()
    };
    let mut agent = QLearningAgent::new(
        config,
        Box::new(SegmentEvaluator),
        Box::new(FixedGenerator(random_problems(1, 4, 3).remove(0))),
    )
    .unwrap();

    let mut states = 0;
    for _ in 0..30 {
        let mut state = agent.begin_episode(SizeConstraint::Unconstrained).unwrap();
        loop {
            let known = agent.store().lookup(&state).is_some();
            let reseen_before = agent.reseen_count();

            let Some(outcome) = agent.step(&state, SelectionMode::Explore, true) else {
                break;
            };

            assert_eq!(agent.reseen_count() - reseen_before, u64::from(known));
            assert!(agent.store().len() >= states);
            states = agent.store().len();

            state = state.extend(outcome.action);
            if !outcome.success {
                break;
            }
        }
    }
    assert!(agent.reseen_count() > 0);
}

/// Test selected actions are always legal and unchosen
#[test]
fn test_selected_actions_are_legal() {
    for points in 1..=6 {
        let config = AgentConfig {
            number_of_points: points,
            rounding_unit: 10,
            seed: Some(points as u64),
            ..AgentConfig::default()
        };
        let mut agent = QLearningAgent::new(
            config,
            Box::new(SegmentEvaluator),
            Box::new(RandomProblemGenerator::new()),
        )
        .unwrap();

        for episode in 0..25 {
            let mode = if episode % 3 == 0 {
                SelectionMode::Exploit
            } else {
                SelectionMode::Explore
            };
            let mut state = agent.begin_episode(SizeConstraint::Unconstrained).unwrap();
            while let Some(outcome) = agent.step(&state, mode, true) {
                assert!(outcome.action < points);
                assert!(!state.prefix().contains(&outcome.action));
                state = state.extend(outcome.action);
                if !outcome.success {
                    break;
                }
            }
            assert!(state.depth() <= points);
        }
    }
}

/// Test exploit never selects an action whose subtree is all dead ends
#[test]
fn test_dead_end_propagation() {
    let (canonical, _) = canonicalize(&three_points(), 1);
    let root = StateKey::root(Arc::new(canonical));
    let mut store = ActionValueStore::new(UpdateRule::new(0.1, 1, 0.0), 2000.0);
    let mut rng = StdRng::seed_from_u64(0);

    // Action 0 looks best until its subtree dies
    store.record_outcome(&root, 0, Transition::new(true, 1900.0), Estimator::First);
    store.record_outcome(&root, 0, Transition::new(true, 1900.0), Estimator::Second);
    store.record_outcome(&root, 1, Transition::new(true, 1500.0), Estimator::First);
    assert_eq!(
        store.best_action(&root, SelectionMode::Exploit, &mut rng),
        Some(0)
    );

    let child = root.extend(0);
    store.record_outcome(&child, 1, Transition::failed(), Estimator::First);
    store.record_outcome(&child, 2, Transition::failed(), Estimator::Second);
    assert!(!store.lookup(&child).unwrap().has_success());

    store.record_outcome(&root, 0, Transition::new(true, 1900.0), Estimator::First);
    assert!(store.lookup(&root).unwrap().is_dead(0));
    assert_eq!(
        store.best_action(&root, SelectionMode::Exploit, &mut rng),
        Some(1)
    );
}

/// Test permuted copies of a problem share what was learned
#[test]
fn test_permuted_problem_reuses_learning() {
    let problem = three_points();
    let permuted = Problem::new(vec![problem[2], problem[0], problem[1]]);

    let config = AgentConfig {
        number_of_points: 3,
        required_times_seen: 1,
        min_change: 0.0,
        learn_from_queries: false,
        seed: Some(11),
        ..AgentConfig::default()
    };
    let mut agent = QLearningAgent::new(
        config,
        Box::new(distance_evaluator),
        Box::new(FixedGenerator(problem.clone())),
    )
    .unwrap();

    agent.learn(30, SizeConstraint::Unconstrained).unwrap();
    let states = agent.store().len();
    assert!(states > 0);

    let direct = agent.get_solution(&problem).unwrap();
    let via_permuted = agent.get_solution(&permuted).unwrap();

    assert!(direct.success && via_permuted.success);
    assert_eq!(direct.chosen().len(), 3);

    let direct_points: Vec<Point> = direct.chosen().iter().map(|&i| problem[i]).collect();
    let permuted_points: Vec<Point> = via_permuted.chosen().iter().map(|&i| permuted[i]).collect();
    assert_eq!(direct_points, permuted_points);

    // Queries reuse the canonical states learned from the original order
    assert_eq!(agent.store().len(), states);
}

/// Test a batch of identical samples flushes exactly once
#[test]
fn test_batched_update_scenario() {
    let (canonical, _) = canonicalize(&three_points(), 1);
    let root = StateKey::root(Arc::new(canonical));
    let mut store = ActionValueStore::new(UpdateRule::new(0.1, 4, 1.0), 2000.0);

    for visit in 1..=3 {
        store.record_outcome(&root, 2, Transition::new(true, 1800.0), Estimator::Second);
        let stats = store.lookup(&root).unwrap().action(2).unwrap();
        assert_eq!(stats.values, [0.0, 0.0]);
        assert_eq!(stats.accumulators[1].count, visit);
    }

    store.record_outcome(&root, 2, Transition::new(true, 1800.0), Estimator::Second);
    let stats = store.lookup(&root).unwrap().action(2).unwrap();
    // Unseen successor bootstraps to zero, so the batch mean is the reward
    assert_eq!(stats.values, [0.0, 1800.0]);
    assert_eq!(stats.accumulators[1].count, 0);
    assert_eq!(stats.accumulators[1].sum, 0.0);
    assert_eq!(stats.uncertainty, [1.0, 1.0]);
}

/// Test one failure zeroes everything regardless of pending samples
#[test]
fn test_failure_forcing_scenario() {
    let (canonical, _) = canonicalize(&three_points(), 1);
    let root = StateKey::root(Arc::new(canonical));
    let mut store = ActionValueStore::new(UpdateRule::new(0.1, 2, 0.0), 2000.0);

    for estimator in [Estimator::First, Estimator::Second] {
        store.record_outcome(&root, 1, Transition::new(true, 1700.0), estimator);
        store.record_outcome(&root, 1, Transition::new(true, 1700.0), estimator);
    }
    store.record_outcome(&root, 1, Transition::new(true, 1700.0), Estimator::First);
    let before = store.lookup(&root).unwrap().action(1).unwrap().clone();
    assert_eq!(before.values, [1700.0, 1700.0]);
    assert_eq!(before.accumulators[0].count, 1);

    store.record_outcome(&root, 1, Transition::failed(), Estimator::Second);
    let after = store.lookup(&root).unwrap().action(1).unwrap();
    assert!(!after.success);
    assert_eq!(after.values, [0.0, 0.0]);
    assert_eq!(after.uncertainty, [0.0, 0.0]);
    assert_eq!(after.accumulators[0].count, 0);
}

/// Test learning on generated problems reports consistent totals
#[test]
fn test_learn_report_consistency() {
    let config = AgentConfig {
        number_of_points: 5,
        rounding_unit: 20,
        seed: Some(21),
        ..AgentConfig::default()
    };
    let mut agent = QLearningAgent::new(
        config,
        Box::new(SegmentEvaluator),
        Box::new(RandomProblemGenerator::new()),
    )
    .unwrap();

    let first = agent.learn(40, SizeConstraint::Square(300)).unwrap();
    let second = agent.learn(40, SizeConstraint::Square(300)).unwrap();

    assert_eq!(first.episodes, 40);
    assert!(first.successes <= first.episodes);
    assert!(second.states >= first.states);
    assert!(second.reseen >= first.reseen);
    for pct in second.quartile_success {
        assert!((0.0..=100.0).contains(&pct));
    }
}
