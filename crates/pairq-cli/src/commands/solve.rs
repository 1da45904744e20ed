//! Solve a problem read from a JSON file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use pairq_core::Problem;
use pairq_rl::{brute_force_solve, BaselineSolution};

use super::{build_agent, emit, train, TrainingSummary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// JSON file holding a list of [x1, y1, x2, y2] points
    problem: PathBuf,

    /// Also report the best order found by exhaustive search
    #[arg(short, long)]
    brute_force: bool,
}

#[derive(Debug, Serialize)]
struct SolveOutput {
    learning: TrainingSummary,
    /// Point indices in connection order; -1 marks unused slots
    order: Vec<i64>,
    success: bool,
    reward: f64,
    brute_force: Option<BaselineSolution>,
}

fn read_problem(path: &Path) -> Result<Problem> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read problem file {}", path.display()))?;
    let problem: Problem = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse problem file {}", path.display()))?;
    problem
        .check_coordinates()
        .with_context(|| format!("Problem file {} is out of range", path.display()))?;
    Ok(problem)
}

pub async fn run(args: SolveArgs, mut config: Config, json: bool) -> Result<()> {
    let problem = read_problem(&args.problem)?;
    anyhow::ensure!(!problem.is_empty(), "problem file {} has no points", args.problem.display());
    config.agent.number_of_points = problem.len();

    let agent = build_agent(&config)?;
    let (mut agent, learning) = train(agent, &config).await?;
    let solution = agent.get_solution(&problem)?;

    let brute_force = if args.brute_force {
        brute_force_solve(&problem, agent.evaluator(), config.agent.max_reward_per_point)
    } else {
        None
    };

    let output = SolveOutput {
        learning,
        order: solution.sentinel_order(),
        success: solution.success,
        reward: solution.reward,
        brute_force,
    };
    emit(json, &output, |output| {
        output.learning.print();
        println!();
        println!("Solution");
        println!("========");
        println!("  Order:    {:?}", output.order);
        println!("  Success:  {}", output.success);
        println!("  Reward:   {:.2}", output.reward);
        if let Some(best) = &output.brute_force {
            println!("  Best:     {:?} (reward {:.2})", best.order, best.reward);
        } else if args.brute_force {
            println!("  Best:     no successful order");
        }
    })
}
