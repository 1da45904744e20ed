//! Baseline solvers the agent is benchmarked against
//!
//! These work on full orders of the caller's problem and never touch the
//! action-value store.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pairq_core::{Evaluator, Problem};

use crate::update::shaped_reward;

/// Orders with more points than this are not brute forced
pub const MAX_BRUTE_FORCE_POINTS: usize = 9;

/// A scored full order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineSolution {
    pub order: Vec<usize>,
    pub success: bool,
    pub reward: f64,
}

/// Available baseline solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    BruteForce,
    Nearest,
    Random,
    HillClimbing,
    SimulatedAnnealing,
}

impl Baseline {
    pub const ALL: [Baseline; 5] = [
        Baseline::BruteForce,
        Baseline::Nearest,
        Baseline::Random,
        Baseline::HillClimbing,
        Baseline::SimulatedAnnealing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Baseline::BruteForce => "brute_force",
            Baseline::Nearest => "nearest",
            Baseline::Random => "random",
            Baseline::HillClimbing => "hill_climbing",
            Baseline::SimulatedAnnealing => "simulated_annealing",
        }
    }

    /// Solve `problem`; `None` only when brute force finds no successful order
    /// or the problem is too large to brute force
    pub fn solve<R: Rng + ?Sized>(
        &self,
        problem: &Problem,
        evaluator: &dyn Evaluator,
        max_reward_per_point: f64,
        rng: &mut R,
    ) -> Option<BaselineSolution> {
        let scorer = Scorer {
            problem,
            evaluator,
            max_reward_per_point,
        };
        match self {
            Baseline::BruteForce => brute_force(&scorer),
            Baseline::Nearest => Some(scorer.score(nearest_order(problem))),
            Baseline::Random => Some(scorer.score(random_order(problem.len(), rng))),
            Baseline::HillClimbing => Some(hill_climbing(&scorer, rng)),
            Baseline::SimulatedAnnealing => Some(simulated_annealing(&scorer, rng)),
        }
    }
}

struct Scorer<'a> {
    problem: &'a Problem,
    evaluator: &'a dyn Evaluator,
    max_reward_per_point: f64,
}

impl Scorer<'_> {
    fn score(&self, order: Vec<usize>) -> BaselineSolution {
        let evaluation = self.evaluator.evaluate(self.problem, &order);
        let reward = shaped_reward(
            evaluation.success,
            evaluation.measure,
            order.len(),
            self.max_reward_per_point,
        );
        BaselineSolution {
            order,
            success: evaluation.success,
            reward,
        }
    }
}

/// Best successful order over all permutations
pub fn brute_force_solve(
    problem: &Problem,
    evaluator: &dyn Evaluator,
    max_reward_per_point: f64,
) -> Option<BaselineSolution> {
    brute_force(&Scorer {
        problem,
        evaluator,
        max_reward_per_point,
    })
}

fn brute_force(scorer: &Scorer<'_>) -> Option<BaselineSolution> {
    let n = scorer.problem.len();
    if n > MAX_BRUTE_FORCE_POINTS {
        debug!("Skipping brute force for {} points", n);
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut best: Option<BaselineSolution> = None;
    loop {
        let candidate = scorer.score(order.clone());
        if candidate.success && best.as_ref().map_or(true, |b| candidate.reward > b.reward) {
            best = Some(candidate);
        }
        if !next_permutation(&mut order) {
            break;
        }
    }
    best
}

/// Advance to the next lexicographic permutation; `false` after the last one
fn next_permutation(order: &mut [usize]) -> bool {
    let Some(pivot) = order.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(successor) = order.iter().rposition(|&x| x > order[pivot]) else {
        return false;
    };
    order.swap(pivot, successor);
    order[pivot + 1..].reverse();
    true
}

/// All points sorted by span, shortest first
fn nearest_order(problem: &Problem) -> Vec<usize> {
    let mut order: Vec<usize> = (0..problem.len()).collect();
    order.sort_by(|&a, &b| problem[a].span().total_cmp(&problem[b].span()));
    order
}

fn random_order<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}

fn effective_reward(solution: &BaselineSolution) -> f64 {
    if solution.success {
        solution.reward
    } else {
        0.0
    }
}

/// Steepest ascent over pairwise swaps from a random start
fn hill_climbing<R: Rng + ?Sized>(scorer: &Scorer<'_>, rng: &mut R) -> BaselineSolution {
    let mut current = scorer.score(random_order(scorer.problem.len(), rng));
    let n = current.order.len();

    loop {
        let mut best_neighbour: Option<BaselineSolution> = None;
        for i in 0..n {
            for j in i + 1..n {
                let mut order = current.order.clone();
                order.swap(i, j);
                let neighbour = scorer.score(order);
                let beats_best = best_neighbour
                    .as_ref()
                    .map_or(true, |b| effective_reward(&neighbour) > effective_reward(b));
                if neighbour.success && beats_best {
                    best_neighbour = Some(neighbour);
                }
            }
        }

        match best_neighbour {
            Some(neighbour) if effective_reward(&neighbour) > effective_reward(&current) => {
                current = neighbour;
            }
            _ => return current,
        }
    }
}

/// Random-swap annealing: start temperature 500, cooling factor 0.2,
/// iterations per temperature starting at 10 and doubling
fn simulated_annealing<R: Rng + ?Sized>(scorer: &Scorer<'_>, rng: &mut R) -> BaselineSolution {
    let mut current = scorer.score(random_order(scorer.problem.len(), rng));
    let mut best = current.clone();
    let n = current.order.len();
    if n < 2 {
        return current;
    }

    let mut temperature = 500.0_f64;
    let mut iterations = 10;
    while temperature > 1.0 {
        for _ in 0..iterations {
            let i = rng.gen_range(0..n);
            let j = (i + rng.gen_range(1..n)) % n;
            let mut order = current.order.clone();
            order.swap(i, j);

            let neighbour = scorer.score(order);
            let delta = effective_reward(&neighbour) - effective_reward(&current);
            if delta > 0.0 || rng.gen::<f64>() < (delta / temperature).exp() {
                current = neighbour;
                if effective_reward(&current) > effective_reward(&best) {
                    best = current.clone();
                }
            }
        }
        temperature *= 0.2;
        iterations *= 2;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairq_core::{Evaluation, Point, SegmentEvaluator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Succeeds only when point 0 goes first; cost grows with position * index
    fn picky(_: &Problem, order: &[usize]) -> Evaluation {
        let success = order.first() == Some(&0);
        let measure = order
            .iter()
            .enumerate()
            .map(|(pos, &i)| (pos * i) as f64)
            .sum();
        Evaluation::new(order.to_vec(), success, measure)
    }

    fn problem(n: i64) -> Problem {
        Problem::new((0..n).map(|i| Point::new(i * 20, 0, i * 20, 10 + i)).collect())
    }

    #[test]
    fn test_next_permutation_enumerates_all() {
        let mut order = vec![0, 1, 2, 3];
        let mut count = 1;
        while next_permutation(&mut order) {
            count += 1;
        }
        assert_eq!(count, 24);
        assert_eq!(order, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_brute_force_finds_best_successful_order() {
        let best = brute_force_solve(&problem(4), &picky, 100.0).unwrap();

        assert!(best.success);
        assert_eq!(best.order[0], 0);
        // Largest index latest minimises position * index
        assert_eq!(best.order, vec![0, 3, 2, 1]);
    }

    #[test]
    fn test_brute_force_none_when_nothing_succeeds() {
        let never = |_: &Problem, order: &[usize]| Evaluation::new(order.to_vec(), false, 0.0);
        assert!(brute_force_solve(&problem(3), &never, 100.0).is_none());
    }

    #[test]
    fn test_nearest_order_sorts_by_span() {
        let problem = Problem::new(vec![
            Point::new(0, 0, 0, 30),
            Point::new(20, 0, 20, 10),
            Point::new(40, 0, 40, 20),
        ]);
        assert_eq!(nearest_order(&problem), vec![1, 2, 0]);
    }

    #[test]
    fn test_all_baselines_return_full_orders() {
        let problem = problem(5);
        let mut rng = StdRng::seed_from_u64(12);

        for baseline in Baseline::ALL {
            let solution = baseline
                .solve(&problem, &SegmentEvaluator, 2000.0, &mut rng)
                .unwrap();
            let mut sorted = solution.order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4], "{}", baseline.name());
        }
    }

    #[test]
    fn test_local_search_bounded_by_optimum() {
        let problem = problem(5);
        let scorer = Scorer {
            problem: &problem,
            evaluator: &picky,
            max_reward_per_point: 100.0,
        };
        let optimum = brute_force(&scorer).unwrap().reward;

        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..5 {
            let climbed = hill_climbing(&scorer, &mut rng);
            let annealed = simulated_annealing(&scorer, &mut rng);
            assert!(effective_reward(&climbed) <= optimum);
            assert!(effective_reward(&annealed) <= optimum);
        }
    }
}
