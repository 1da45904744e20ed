//! Problem canonicalization
//!
//! Geometrically equivalent problems (same points, any input order, small
//! coordinate jitter below the rounding unit) map to one canonical problem so
//! they share entries in the action-value store.

use std::ops::Deref;

use pairq_core::util::round_to_multiple;
use pairq_core::Problem;

/// A problem with rounded coordinates and points in lexicographic order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalProblem(Problem);

impl CanonicalProblem {
    pub fn as_problem(&self) -> &Problem {
        &self.0
    }

    pub fn into_problem(self) -> Problem {
        self.0
    }
}

impl Deref for CanonicalProblem {
    type Target = Problem;

    fn deref(&self) -> &Problem {
        &self.0
    }
}

/// `permutation[slot]` is the original index placed at canonical `slot`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Original index for a canonical slot
    pub fn original(&self, slot: usize) -> Option<usize> {
        self.0.get(slot).copied()
    }

    /// Canonical slot holding an original index
    pub fn canonical(&self, original: usize) -> Option<usize> {
        self.0.iter().position(|&o| o == original)
    }

    /// Map a canonical order back to original indices.
    ///
    /// Panics if the order names a slot outside the permutation.
    pub fn to_original(&self, order: &[usize]) -> Vec<usize> {
        order.iter().map(|&slot| self.0[slot]).collect()
    }
}

/// Round every coordinate to `rounding_unit` and sort points lexicographically.
///
/// Points whose rounded coordinates are identical keep their original
/// relative order (lowest original index first), so each original point is
/// placed exactly once.
pub fn canonicalize(problem: &Problem, rounding_unit: i64) -> (CanonicalProblem, Permutation) {
    let rounded: Vec<_> = problem
        .iter()
        .map(|p| p.map(|c| round_to_multiple(c, rounding_unit)))
        .collect();

    let mut permutation: Vec<usize> = (0..rounded.len()).collect();
    // Stable, so equal keys stay in scan order.
    permutation.sort_by(|&a, &b| rounded[a].cmp(&rounded[b]));

    let points = permutation.iter().map(|&i| rounded[i]).collect();
    (CanonicalProblem(Problem::new(points)), Permutation(permutation))
}
