//! Async wrapper for running learning episodes concurrently
//!
//! All table mutation goes through a single writer lock. Each
//! select → evaluate → fold step takes the lock on its own, so concurrent
//! episodes interleave step by step. An episode that exceeds its timeout is
//! dropped; transitions it already folded stay in the table.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use pairq_core::{PairqError, Problem, Result, SizeConstraint};

use crate::agent::{EpisodeOutcome, QLearningAgent, Solution};
use crate::store::{SelectionMode, StoreStats};

/// Totals over a concurrent learning run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceReport {
    pub completed: usize,
    pub successes: usize,
    pub timed_out: usize,
    pub states: usize,
    pub reseen: u64,
}

impl ServiceReport {
    fn merge(&mut self, other: &ServiceReport) {
        self.completed += other.completed;
        self.successes += other.successes;
        self.timed_out += other.timed_out;
    }
}

/// Shared agent with async access
pub struct AgentService {
    agent: RwLock<QLearningAgent>,
    episode_timeout: Duration,
}

impl AgentService {
    pub fn new(agent: QLearningAgent, episode_timeout: Duration) -> Self {
        info!("Agent service initialized, episode timeout: {:?}", episode_timeout);
        Self {
            agent: RwLock::new(agent),
            episode_timeout,
        }
    }

    /// Run `episodes` learning episodes spread over `workers` tasks
    pub async fn learn(
        self: &Arc<Self>,
        episodes: usize,
        workers: usize,
        constraint: SizeConstraint,
    ) -> Result<ServiceReport> {
        let workers = workers.clamp(1, episodes.max(1));
        info!("Concurrent learning: {} episodes on {} workers", episodes, workers);

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let share = episodes / workers + usize::from(worker < episodes % workers);
            let service = Arc::clone(self);
            tasks.spawn(async move { service.run_worker(worker, share, constraint).await });
        }

        let mut report = ServiceReport::default();
        while let Some(joined) = tasks.join_next().await {
            let worker_report =
                joined.map_err(|e| PairqError::Internal(format!("learning worker panicked: {e}")))??;
            report.merge(&worker_report);
        }

        let stats = self.stats().await;
        report.states = stats.states;
        report.reseen = stats.reseen;

        info!(
            "Concurrent learning finished: {} completed, {} timed out, {} states",
            report.completed, report.timed_out, report.states
        );
        Ok(report)
    }

    async fn run_worker(
        &self,
        worker: usize,
        episodes: usize,
        constraint: SizeConstraint,
    ) -> Result<ServiceReport> {
        let mut report = ServiceReport::default();

        for _ in 0..episodes {
            match tokio::time::timeout(self.episode_timeout, self.run_episode(constraint)).await {
                Ok(Ok(outcome)) => {
                    report.completed += 1;
                    if outcome.success {
                        report.successes += 1;
                    }
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!("Worker {} episode timed out, discarding order", worker);
                    report.timed_out += 1;
                }
            }
        }

        debug!("Worker {} done: {:?}", worker, report);
        Ok(report)
    }

    async fn run_episode(&self, constraint: SizeConstraint) -> Result<EpisodeOutcome> {
        let mut state = self.agent.write().await.begin_episode(constraint)?;
        let mut success = false;
        let mut reward = 0.0;

        loop {
            let step = {
                let mut agent = self.agent.write().await;
                agent.step(&state, SelectionMode::Explore, true)
            };
            let Some(outcome) = step else {
                break;
            };

            state = state.extend(outcome.action);
            success = outcome.success;
            reward = outcome.reward;
            if !success {
                break;
            }
            tokio::task::yield_now().await;
        }

        Ok(EpisodeOutcome {
            order: state.prefix().to_vec(),
            success,
            reward,
        })
    }

    /// Answer a solution query, giving up after the episode timeout
    pub async fn get_solution(&self, problem: &Problem) -> Result<Solution> {
        let query = async { self.agent.write().await.get_solution(problem) };
        tokio::time::timeout(self.episode_timeout, query)
            .await
            .map_err(|_| {
                PairqError::Timeout(format!(
                    "solution query exceeded {:?}",
                    self.episode_timeout
                ))
            })?
    }

    pub async fn reseen_count(&self) -> u64 {
        self.agent.read().await.reseen_count()
    }

    pub async fn stats(&self) -> StoreStats {
        self.agent.read().await.stats()
    }

    /// Take the agent back out of the service
    pub fn into_inner(self) -> QLearningAgent {
        self.agent.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use pairq_core::{Evaluation, RandomProblemGenerator, SegmentEvaluator};

    fn service(timeout: Duration) -> Arc<AgentService> {
        let config = AgentConfig {
            number_of_points: 4,
            seed: Some(3),
            ..AgentConfig::default()
        };
        let agent = QLearningAgent::new(
            config,
            Box::new(SegmentEvaluator),
            Box::new(RandomProblemGenerator::new()),
        )
        .unwrap();
        Arc::new(AgentService::new(agent, timeout))
    }

    #[tokio::test]
    async fn test_concurrent_learning_completes_all_episodes() {
        let service = service(Duration::from_secs(30));
        let report = service
            .learn(40, 4, SizeConstraint::Unconstrained)
            .await
            .unwrap();

        assert_eq!(report.completed, 40);
        assert_eq!(report.timed_out, 0);
        assert!(report.states > 0);
        assert_eq!(report.reseen, service.reseen_count().await);
    }

    #[tokio::test]
    async fn test_every_episode_is_accounted_for() {
        let service = service(Duration::ZERO);
        let report = service
            .learn(10, 2, SizeConstraint::Unconstrained)
            .await
            .unwrap();

        assert_eq!(report.completed + report.timed_out, 10);
        assert!(report.successes <= report.completed);
    }

    #[tokio::test]
    async fn test_timed_out_episode_keeps_folded_steps() {
        let slow = |_: &Problem, order: &[usize]| {
            std::thread::sleep(Duration::from_millis(25));
            Evaluation::new(order.to_vec(), true, 1.0)
        };
        let config = AgentConfig {
            number_of_points: 4,
            seed: Some(3),
            ..AgentConfig::default()
        };
        let agent = QLearningAgent::new(
            config,
            Box::new(slow),
            Box::new(RandomProblemGenerator::new()),
        )
        .unwrap();
        let service = Arc::new(AgentService::new(agent, Duration::from_millis(2)));

        let report = service.learn(1, 1, SizeConstraint::Unconstrained).await.unwrap();

        assert_eq!(report.timed_out, 1);
        assert_eq!(report.completed, 0);
        assert_eq!(report.successes, 0);
        // The order is discarded but its first step was already folded
        assert!(report.states > 0);
        assert_eq!(service.stats().await.dead_ends, 0);
    }

    #[tokio::test]
    async fn test_zero_episodes() {
        let service = service(Duration::from_secs(1));
        let report = service.learn(0, 8, SizeConstraint::Unconstrained).await.unwrap();

        assert_eq!(report.completed, 0);
        assert_eq!(report.states, 0);
    }

    #[tokio::test]
    async fn test_solution_through_service() {
        let service = service(Duration::from_secs(30));
        service.learn(10, 2, SizeConstraint::Square(200)).await.unwrap();

        let problem = Problem::new(vec![
            pairq_core::Point::new(400, 400, 1400, 400),
            pairq_core::Point::new(450, 450, 1450, 450),
            pairq_core::Point::new(500, 500, 1500, 500),
            pairq_core::Point::new(550, 550, 1550, 550),
        ]);
        let solution = service.get_solution(&problem).await.unwrap();
        assert_eq!(solution.order.len(), 4);
        assert!(solution.chosen().iter().all(|&i| i < 4));
    }

    #[tokio::test]
    async fn test_solution_query_times_out_while_locked() {
        let service = service(Duration::from_millis(20));
        let problem = Problem::new(vec![
            pairq_core::Point::new(400, 400, 1400, 400),
            pairq_core::Point::new(450, 450, 1450, 450),
            pairq_core::Point::new(500, 500, 1500, 500),
            pairq_core::Point::new(550, 550, 1550, 550),
        ]);

        let guard = service.agent.write().await;
        let result = service.get_solution(&problem).await;
        drop(guard);

        assert!(matches!(result, Err(PairqError::Timeout(_))));
        assert!(service.get_solution(&problem).await.is_ok());
    }
}
