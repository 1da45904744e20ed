//! Evaluator seam and the reference straight-segment evaluator

use crate::types::{Coord, Evaluation, Point, Problem};

/// Scores a candidate (possibly partial) order for a problem.
///
/// Implementations decide what "success" means; the learning agent only relies
/// on the success flag and on lower measures being better.
pub trait Evaluator: Send + Sync {
    /// Evaluator name, used in logs
    fn name(&self) -> &str {
        "custom"
    }

    /// Evaluate `order` (indices into `problem`) and return success and cost
    fn evaluate(&self, problem: &Problem, order: &[usize]) -> Evaluation;
}

impl<F> Evaluator for F
where
    F: Fn(&Problem, &[usize]) -> Evaluation + Send + Sync,
{
    fn evaluate(&self, problem: &Problem, order: &[usize]) -> Evaluation {
        self(problem, order)
    }
}

/// Connects each pair with a straight segment in the given order.
///
/// A placement fails when its segment properly crosses a segment that is
/// already placed. Collinear touching is not treated as a crossing. The
/// measure is the total length of the segments in the order. Orders that
/// repeat an index or name an index outside the problem are unsuccessful.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentEvaluator;

impl SegmentEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for SegmentEvaluator {
    fn name(&self) -> &str {
        "segment"
    }

    fn evaluate(&self, problem: &Problem, order: &[usize]) -> Evaluation {
        let mut placed: Vec<&Point> = Vec::with_capacity(order.len());
        let mut measure = 0.0;
        let mut success = true;

        for (position, &index) in order.iter().enumerate() {
            let Some(point) = problem.get(index) else {
                success = false;
                break;
            };
            if order[..position].contains(&index) {
                success = false;
                break;
            }

            measure += point.span();
            if placed.iter().any(|other| segments_cross(point, other)) {
                success = false;
            }
            placed.push(point);
        }

        Evaluation::new(order.to_vec(), success, measure)
    }
}

fn orientation(a: &Coord, b: &Coord, c: &Coord) -> i128 {
    let d = |p: i64, q: i64| i128::from(p) - i128::from(q);
    let (abx, aby) = (d(b.x, a.x), d(b.y, a.y));
    let (acx, acy) = (d(c.x, a.x), d(c.y, a.y));

    // Exact unless a product overflows i128; then the sign comes from f64
    match (abx.checked_mul(acy), aby.checked_mul(acx)) {
        (Some(lhs), Some(rhs)) => match lhs.checked_sub(rhs) {
            Some(cross) => cross.signum(),
            None => i128::from(lhs > rhs) - i128::from(lhs < rhs),
        },
        _ => {
            let cross = abx as f64 * acy as f64 - aby as f64 * acx as f64;
            i128::from(cross > 0.0) - i128::from(cross < 0.0)
        }
    }
}

/// True when the two segments cross at a single interior point
pub fn segments_cross(a: &Point, b: &Point) -> bool {
    let o1 = orientation(&a.from, &a.to, &b.from);
    let o2 = orientation(&a.from, &a.to, &b.to);
    let o3 = orientation(&b.from, &b.to, &a.from);
    let o4 = orientation(&b.from, &b.to, &a.to);

    o1 * o2 < 0 && o3 * o4 < 0
}
