//! Random problem generation and the validity predicate

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PairqError, Result};
use crate::types::{Point, Problem};

/// Minimum distance between any two from-locations and any two to-locations
pub const MIN_SEPARATION: f64 = 15.0;

/// Attempts before an unconstrained generation gives up
const MAX_ATTEMPTS: usize = 100_000;

/// Where generated points may be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeConstraint {
    /// Full generation area
    #[default]
    Unconstrained,
    /// Points on a 10-unit lattice inside a square of this width
    Square(u32),
}

impl SizeConstraint {
    /// `0` means unconstrained, anything else a square of that width
    pub fn from_square_size(size: u32) -> Self {
        if size == 0 {
            Self::Unconstrained
        } else {
            Self::Square(size)
        }
    }
}

/// Produces valid random problem instances
pub trait ProblemGenerator: Send + Sync {
    fn generate(
        &self,
        number_of_points: usize,
        constraint: SizeConstraint,
        rng: &mut StdRng,
    ) -> Result<Problem>;
}

/// Checks that every pair of points is at least `MIN_SEPARATION` apart under
/// both the from and the to locations
pub fn is_valid_problem(problem: &Problem) -> bool {
    let points = problem.points();
    points.iter().enumerate().all(|(i, a)| {
        points[i + 1..].iter().all(|b| {
            a.from.distance(&b.from) >= MIN_SEPARATION && a.to.distance(&b.to) >= MIN_SEPARATION
        })
    })
}

/// Default generator.
///
/// Unconstrained problems draw from-locations in `[400, 600]²` and
/// to-locations in `[1400, 1600] × [400, 600]`, regenerating the whole
/// instance until it is valid. Square-constrained problems draw each point on
/// a 10-unit lattice around `(500, 500)` / `(1500, 500)`, re-drawing a single
/// point until it is valid against the points already placed.
#[derive(Debug, Clone)]
pub struct RandomProblemGenerator {
    max_attempts: usize,
}

impl RandomProblemGenerator {
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn unconstrained(&self, number_of_points: usize, rng: &mut StdRng) -> Result<Problem> {
        for attempt in 1..=self.max_attempts {
            let points = (0..number_of_points)
                .map(|_| {
                    Point::new(
                        rng.gen_range(400..=600),
                        rng.gen_range(400..=600),
                        rng.gen_range(1400..=1600),
                        rng.gen_range(400..=600),
                    )
                })
                .collect();
            let problem = Problem::new(points);
            if is_valid_problem(&problem) {
                debug!("Generated valid problem after {} attempts", attempt);
                return Ok(problem);
            }
        }

        Err(PairqError::Generation(format!(
            "no valid {number_of_points}-point problem after {} attempts",
            self.max_attempts
        )))
    }

    fn square(&self, number_of_points: usize, size: u32, rng: &mut StdRng) -> Result<Problem> {
        let half = i64::from(size / 20);
        let mut points: Vec<Point> = Vec::with_capacity(number_of_points);

        for _ in 0..number_of_points {
            let mut placed = false;
            for _ in 0..self.max_attempts {
                let candidate = Point::new(
                    rng.gen_range(50 - half..=50 + half) * 10,
                    rng.gen_range(50 - half..=50 + half) * 10,
                    rng.gen_range(150 - half..=150 + half) * 10,
                    rng.gen_range(50 - half..=50 + half) * 10,
                );
                let separated = points.iter().all(|p| {
                    p.from.distance(&candidate.from) >= MIN_SEPARATION
                        && p.to.distance(&candidate.to) >= MIN_SEPARATION
                });
                if separated {
                    points.push(candidate);
                    placed = true;
                    break;
                }
            }
            if !placed {
                return Err(PairqError::Generation(format!(
                    "square of size {size} cannot fit {number_of_points} separated points"
                )));
            }
        }

        Ok(Problem::new(points))
    }
}

impl Default for RandomProblemGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemGenerator for RandomProblemGenerator {
    fn generate(
        &self,
        number_of_points: usize,
        constraint: SizeConstraint,
        rng: &mut StdRng,
    ) -> Result<Problem> {
        match constraint {
            SizeConstraint::Unconstrained => self.unconstrained(number_of_points, rng),
            SizeConstraint::Square(size) => self.square(number_of_points, size, rng),
        }
    }
}
