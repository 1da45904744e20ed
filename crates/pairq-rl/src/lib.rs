//! pairq RL - Double Q-learning agent for pair-connection ordering
//!
//! This crate learns an order in which to connect pairs of points so an
//! evaluator judges it successful, reusing experience across geometrically
//! equivalent problems through canonicalization.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod baseline;
pub mod canonical;
pub mod config;
pub mod heuristic;
pub mod policy;
pub mod service;
pub mod store;
pub mod update;

pub use agent::{EpisodeOutcome, LearnReport, QLearningAgent, Solution, StepOutcome};
pub use baseline::{brute_force_solve, Baseline, BaselineSolution};
pub use canonical::{canonicalize, CanonicalProblem, Permutation};
pub use config::AgentConfig;
pub use heuristic::{nearest_unconnected, random_unconnected, Strategy};
pub use policy::LearnedPolicy;
pub use service::{AgentService, ServiceReport};
pub use store::{ActionStats, ActionValueStore, SelectionMode, StateEntry, StateKey, StoreStats};
pub use update::{Estimator, FoldOutcome, Transition, UpdateRule};
