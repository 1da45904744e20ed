//! Learning run with an optional test phase

use std::time::Instant;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use pairq_rl::LearnReport;

use super::{build_agent, emit, train, TrainingSummary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct LearnArgs {
    /// Episodes to run after learning, reported by quarter
    #[arg(short, long)]
    test_episodes: Option<usize>,
}

#[derive(Debug, Serialize)]
struct LearnOutput {
    learning: TrainingSummary,
    testing: Option<LearnReport>,
    testing_secs: Option<f64>,
}

pub async fn run(args: LearnArgs, config: &Config, json: bool) -> Result<()> {
    let agent = build_agent(config)?;
    let (mut agent, learning) = train(agent, config).await?;

    let test_episodes = args.test_episodes.unwrap_or(config.learning.test_episodes);
    let (testing, testing_secs) = if test_episodes > 0 {
        let started = Instant::now();
        let report = agent.learn(test_episodes, config.learning.constraint())?;
        (Some(report), Some(started.elapsed().as_secs_f64()))
    } else {
        (None, None)
    };

    let output = LearnOutput {
        learning,
        testing,
        testing_secs,
    };
    emit(json, &output, |output| {
        output.learning.print();
        if let (Some(report), Some(secs)) = (&output.testing, output.testing_secs) {
            println!();
            println!("Testing");
            println!("=======");
            println!("  Episodes:   {}", report.episodes);
            println!("  Successes:  {}", report.successes);
            println!("  Mean reward: {:.2}", report.mean_reward);
            let labels = ["<25%", "25-50%", "50-75%", ">75%"];
            for (label, pct) in labels.iter().zip(report.quartile_success) {
                println!("  {label:>8}: {pct:.1}% successful");
            }
            println!("  Took:       {secs:.2}s");
        }
    })
}
