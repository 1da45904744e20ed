//! CLI command modules

pub mod compare;
pub mod learn;
pub mod solve;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::info;

use pairq_core::{RandomProblemGenerator, SegmentEvaluator};
use pairq_rl::{AgentService, LearnReport, QLearningAgent, ServiceReport};

use crate::config::Config;

/// Totals of the learning phase, however it was run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub successes: usize,
    pub timed_out: usize,
    pub states: usize,
    pub reseen: u64,
    pub elapsed_secs: f64,
}

impl TrainingSummary {
    fn from_report(report: &LearnReport, elapsed: Duration) -> Self {
        Self {
            episodes: report.episodes,
            successes: report.successes,
            timed_out: 0,
            states: report.states,
            reseen: report.reseen,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    fn from_service(report: &ServiceReport, elapsed: Duration) -> Self {
        Self {
            episodes: report.completed + report.timed_out,
            successes: report.successes,
            timed_out: report.timed_out,
            states: report.states,
            reseen: report.reseen,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    pub fn print(&self) {
        println!("Learning");
        println!("========");
        println!("  Episodes:   {}", self.episodes);
        println!("  Successes:  {}", self.successes);
        if self.timed_out > 0 {
            println!("  Timed out:  {}", self.timed_out);
        }
        println!("  States:     {}", self.states);
        println!("  Reseen:     {}", self.reseen);
        println!("  Took:       {:.2}s", self.elapsed_secs);
    }
}

/// Agent with the reference evaluator and generator
pub fn build_agent(config: &Config) -> Result<QLearningAgent> {
    QLearningAgent::new(
        config.agent.clone(),
        Box::new(SegmentEvaluator),
        Box::new(RandomProblemGenerator::new()),
    )
    .context("Failed to create agent")
}

/// Run the configured learning phase, concurrently when more than one
/// worker is configured
pub async fn train(agent: QLearningAgent, config: &Config) -> Result<(QLearningAgent, TrainingSummary)> {
    let learning = &config.learning;
    let started = Instant::now();

    if learning.workers <= 1 {
        let mut agent = agent;
        let report = agent.learn(learning.episodes, learning.constraint())?;
        let summary = TrainingSummary::from_report(&report, started.elapsed());
        return Ok((agent, summary));
    }

    let timeout = Duration::from_millis(learning.episode_timeout_ms);
    let service = Arc::new(AgentService::new(agent, timeout));
    let report = service
        .learn(learning.episodes, learning.workers, learning.constraint())
        .await?;
    let summary = TrainingSummary::from_service(&report, started.elapsed());

    let service = Arc::try_unwrap(service)
        .map_err(|_| anyhow!("agent service still shared after learning"))?;
    info!("Concurrent learning took {:.2}s", summary.elapsed_secs);
    Ok((service.into_inner(), summary))
}

/// Print `value` as pretty JSON, or run `text` for the human readable form
pub fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}
