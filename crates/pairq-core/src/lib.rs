//! pairq Core - Problem types, collaborator traits, and shared functionality
//!
//! This crate provides the foundational types used across all pairq components:
//! the pair-connection problem model, the evaluator and generator seams the
//! learning agent consumes, and their reference implementations.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod error;
pub mod evaluator;
pub mod generator;
pub mod types;
pub mod util;

pub use error::{PairqError, Result};
pub use evaluator::{Evaluator, SegmentEvaluator};
pub use generator::{is_valid_problem, ProblemGenerator, RandomProblemGenerator, SizeConstraint};
pub use types::*;
