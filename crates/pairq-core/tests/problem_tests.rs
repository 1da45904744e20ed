//! Integration tests for problem types, generation and evaluation
//! Complements the inline unit tests in src/

use pairq_core::{
    is_valid_problem, Evaluator, Point, Problem, ProblemGenerator, RandomProblemGenerator,
    SegmentEvaluator, SizeConstraint,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_problem_json_is_list_of_quadruples() {
    let problem = Problem::new(vec![
        Point::new(452, 524, 1548, 488),
        Point::new(481, 566, 1461, 474),
    ]);

    let json = serde_json::to_string(&problem).unwrap();
    assert_eq!(json, "[[452,524,1548,488],[481,566,1461,474]]");

    let parsed: Problem = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, problem);
}

#[test]
fn test_generation_is_reproducible_per_seed() {
    let generator = RandomProblemGenerator::new();
    let mut a = StdRng::seed_from_u64(99);
    let mut b = StdRng::seed_from_u64(99);

    for constraint in [SizeConstraint::Unconstrained, SizeConstraint::Square(400)] {
        let first = generator.generate(6, constraint, &mut a).unwrap();
        let second = generator.generate(6, constraint, &mut b).unwrap();
        assert_eq!(first, second);
        assert!(is_valid_problem(&first));
    }
}

#[test]
fn test_generation_stress_always_valid() {
    let generator = RandomProblemGenerator::new();
    let mut rng = StdRng::seed_from_u64(1234);

    for points in 1..=8 {
        for _ in 0..20 {
            let problem = generator
                .generate(points, SizeConstraint::Unconstrained, &mut rng)
                .unwrap();
            assert_eq!(problem.len(), points);
            assert!(is_valid_problem(&problem));
        }
    }
}

#[test]
fn test_impossible_square_reports_generation_error() {
    let generator = RandomProblemGenerator::new().with_max_attempts(50);
    let mut rng = StdRng::seed_from_u64(5);

    // A zero-half square has a single lattice position
    let result = generator.generate(2, SizeConstraint::Square(10), &mut rng);
    assert!(matches!(result, Err(pairq_core::PairqError::Generation(_))));
}

#[test]
fn test_parallel_pairs_all_succeed_in_any_order() {
    let problem = Problem::new(vec![
        Point::new(400, 400, 1400, 400),
        Point::new(400, 450, 1400, 450),
        Point::new(400, 500, 1400, 500),
    ]);
    let evaluator = SegmentEvaluator;

    for order in [[0, 1, 2], [2, 0, 1], [1, 2, 0]] {
        let evaluation = evaluator.evaluate(&problem, &order);
        assert!(evaluation.success);
        assert!((evaluation.measure - 3000.0).abs() < 1e-9);
    }
}

#[test]
fn test_crossing_pair_fails_on_second_placement() {
    let problem = Problem::new(vec![
        Point::new(400, 400, 1400, 600),
        Point::new(400, 600, 1400, 400),
    ]);
    let evaluator = SegmentEvaluator;

    assert!(evaluator.evaluate(&problem, &[0]).success);
    assert!(evaluator.evaluate(&problem, &[1]).success);
    assert!(!evaluator.evaluate(&problem, &[0, 1]).success);
    assert!(!evaluator.evaluate(&problem, &[1, 0]).success);
}

#[test]
fn test_closure_evaluator_through_trait_object() {
    let evaluator: Box<dyn Evaluator> = Box::new(|problem: &Problem, order: &[usize]| {
        pairq_core::Evaluation::new(order.to_vec(), order.len() < problem.len(), 1.0)
    });
    let problem = Problem::new(vec![Point::new(0, 0, 10, 0), Point::new(0, 20, 10, 20)]);

    assert_eq!(evaluator.name(), "custom");
    assert!(evaluator.evaluate(&problem, &[0]).success);
    assert!(!evaluator.evaluate(&problem, &[0, 1]).success);
}
