//! Compare the agent against the baseline orderings on fresh problems
//!
//! With `--gap` every test problem is first solved by brute force and each
//! method is also scored by how far its successful rewards fall short of
//! the optimum.

use anyhow::{bail, ensure, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use pairq_core::{Evaluator, Problem, ProblemGenerator, RandomProblemGenerator, SizeConstraint};
use pairq_rl::baseline::MAX_BRUTE_FORCE_POINTS;
use pairq_rl::{brute_force_solve, Baseline};

use super::{build_agent, emit, train, TrainingSummary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Test problems to solve with every method
    #[arg(short, long, default_value_t = 100)]
    problems: usize,

    /// Only test on problems brute force can solve and report each
    /// method's mean shortfall from the optimal reward
    #[arg(long)]
    gap: bool,
}

/// Regenerations allowed per test problem in gap mode
const MAX_SOLVABLE_ATTEMPTS: usize = 1000;

/// Totals for one ordering method
#[derive(Debug, Clone, Serialize)]
struct MethodResult {
    name: String,
    successes: usize,
    success_pct: f64,
    mean_reward: f64,
    /// Mean of optimal minus achieved reward over successful orders
    #[serde(skip_serializing_if = "Option::is_none")]
    mean_gap: Option<f64>,
}

#[derive(Debug, Default)]
struct Tally {
    successes: usize,
    reward: f64,
    gap: f64,
    gap_samples: usize,
}

impl Tally {
    fn add(&mut self, success: bool, reward: f64) {
        if success {
            self.successes += 1;
            self.reward += reward;
        }
    }

    /// Like `add`, also recording the shortfall from `optimal` on success
    fn add_against(&mut self, success: bool, reward: f64, optimal: f64) {
        self.add(success, reward);
        if success {
            self.gap += optimal - reward;
            self.gap_samples += 1;
        }
    }

    fn finish(&self, name: &str, problems: usize) -> MethodResult {
        let (success_pct, mean_reward) = if problems > 0 {
            (
                self.successes as f64 * 100.0 / problems as f64,
                self.reward / problems as f64,
            )
        } else {
            (0.0, 0.0)
        };
        MethodResult {
            name: name.to_string(),
            successes: self.successes,
            success_pct,
            mean_reward,
            mean_gap: (self.gap_samples > 0).then(|| self.gap / self.gap_samples as f64),
        }
    }
}

/// Generate problems until brute force finds a successful order; returns the
/// problem and its optimal reward
fn solvable_problem(
    generator: &dyn ProblemGenerator,
    evaluator: &dyn Evaluator,
    points: usize,
    constraint: SizeConstraint,
    max_reward_per_point: f64,
    attempts: usize,
    rng: &mut StdRng,
) -> Result<(Problem, f64)> {
    for _ in 0..attempts {
        let problem = generator.generate(points, constraint, rng)?;
        if let Some(optimal) = brute_force_solve(&problem, evaluator, max_reward_per_point) {
            return Ok((problem, optimal.reward));
        }
    }
    bail!("No problem with a successful order found in {attempts} attempts")
}

#[derive(Debug, Serialize)]
struct CompareOutput {
    learning: TrainingSummary,
    problems: usize,
    gap: bool,
    methods: Vec<MethodResult>,
}

pub async fn run(args: CompareArgs, config: &Config, json: bool) -> Result<()> {
    let points = config.agent.number_of_points;
    ensure!(
        !args.gap || points <= MAX_BRUTE_FORCE_POINTS,
        "--gap needs brute force, which is limited to {MAX_BRUTE_FORCE_POINTS} points (got {points})"
    );

    let agent = build_agent(config)?;
    let (mut agent, learning) = train(agent, config).await?;

    // In gap mode brute force is the reference, not a competitor
    let baselines: Vec<Baseline> = Baseline::ALL
        .into_iter()
        .filter(|b| *b != Baseline::BruteForce || (!args.gap && points <= MAX_BRUTE_FORCE_POINTS))
        .collect();

    // Test problems come from their own stream so they do not depend on learning
    let mut rng = match config.agent.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let generator = RandomProblemGenerator::new();
    let constraint = config.learning.constraint();
    let max_reward = config.agent.max_reward_per_point;

    let mut tallies: Vec<Tally> = baselines.iter().map(|_| Tally::default()).collect();
    let mut agent_tally = Tally::default();

    let progress_every = (args.problems / 10).max(1);
    info!("Testing started: {} problems", args.problems);
    for index in 0..args.problems {
        let (problem, optimal) = if args.gap {
            let (problem, optimal) = solvable_problem(
                &generator,
                agent.evaluator(),
                points,
                constraint,
                max_reward,
                MAX_SOLVABLE_ATTEMPTS,
                &mut rng,
            )?;
            (problem, Some(optimal))
        } else {
            (generator.generate(points, constraint, &mut rng)?, None)
        };
        let record = |tally: &mut Tally, success: bool, reward: f64| match optimal {
            Some(optimal) => tally.add_against(success, reward, optimal),
            None => tally.add(success, reward),
        };

        for (baseline, tally) in baselines.iter().zip(tallies.iter_mut()) {
            if let Some(solution) = baseline.solve(&problem, agent.evaluator(), max_reward, &mut rng) {
                record(tally, solution.success, solution.reward);
            }
        }

        let solution = agent.get_solution(&problem)?;
        record(&mut agent_tally, solution.success, solution.reward);

        if (index + 1) % progress_every == 0 {
            info!(
                "{}% complete. Problems reseen: {}",
                (index + 1) * 100 / args.problems,
                agent.reseen_count()
            );
        }
    }
    info!("Testing finished");

    let mut methods: Vec<MethodResult> = baselines
        .iter()
        .zip(&tallies)
        .map(|(baseline, tally)| tally.finish(baseline.name(), args.problems))
        .collect();
    methods.push(agent_tally.finish("q_learning", args.problems));

    let output = CompareOutput {
        learning,
        problems: args.problems,
        gap: args.gap,
        methods,
    };
    emit(json, &output, |output| {
        output.learning.print();
        println!();
        println!("Comparison over {} problems", output.problems);
        println!("============================");
        for method in &output.methods {
            print!(
                "  {:<20} {:>6.1}% successful, mean reward {:.2}",
                method.name, method.success_pct, method.mean_reward
            );
            match (output.gap, method.mean_gap) {
                (true, Some(gap)) => println!(", mean gap to optimal {gap:.2}"),
                (true, None) => println!(", no successful orders to measure"),
                (false, _) => println!(),
            }
        }
    })
}
