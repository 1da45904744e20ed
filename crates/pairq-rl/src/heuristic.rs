//! Fallback heuristics and the closed set of selection strategies

use rand::seq::SliceRandom;
use rand::Rng;

use pairq_core::Problem;

use crate::policy::LearnedPolicy;
use crate::store::StateKey;

/// Unchosen index whose two locations are closest together; first wins ties.
/// `None` when every index is chosen.
pub fn nearest_unconnected(problem: &Problem, chosen: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for index in problem.unchosen(chosen) {
        let span = problem[index].span();
        if best.map_or(true, |(_, shortest)| span < shortest) {
            best = Some((index, span));
        }
    }
    best.map(|(index, _)| index)
}

/// Uniformly random unchosen index, `None` when every index is chosen
pub fn random_unconnected<R: Rng + ?Sized>(
    problem: &Problem,
    chosen: &[usize],
    rng: &mut R,
) -> Option<usize> {
    problem.unchosen(chosen).choose(rng).copied()
}

/// Interchangeable ways of picking the next point
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'a> {
    NearestUnconnected,
    UniformRandom,
    Learned(LearnedPolicy<'a>),
}

impl Strategy<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::NearestUnconnected => "nearest",
            Strategy::UniformRandom => "random",
            Strategy::Learned(_) => "learned",
        }
    }

    /// Next action for the state's problem and partial order
    pub fn select_next_action<R: Rng + ?Sized>(&self, state: &StateKey, rng: &mut R) -> Option<usize> {
        match self {
            Strategy::NearestUnconnected => nearest_unconnected(state.problem(), state.prefix()),
            Strategy::UniformRandom => random_unconnected(state.problem(), state.prefix(), rng),
            Strategy::Learned(policy) => policy.select_next_action(state, rng),
        }
    }
}
