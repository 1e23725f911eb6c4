//! Integration tests for polyopt-solvers
//!
//! These tests drive every backend through the public `OptimizerRep`
//! contract only, the way the façade does.

use approx::assert_relative_eq;
use polyopt_core::prelude::*;
use polyopt_core::test_problems::{
    shifted_quadratic, shifted_quadratic_gradient, unit_sum_constraint, unit_sum_jacobian,
};
use polyopt_solvers::{create_backend, is_available};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn concrete_backends() -> Vec<Algorithm> {
    Algorithm::CONCRETE
        .into_iter()
        .filter(|&algorithm| is_available(algorithm))
        .collect()
}

#[test]
fn test_backends_agree_on_unconstrained_quadratic() {
    let sys = OptimizerSystem::new(4);
    for algorithm in concrete_backends() {
        let mut backend = create_backend(algorithm, &sys).unwrap();
        backend.core_mut().callbacks_mut().set_objective(shifted_quadratic);
        backend.core_mut().callbacks_mut().set_gradient(shifted_quadratic_gradient);
        backend.set_convergence_tolerance(1e-8);

        let mut x = Vector::zeros(4);
        let f = backend.optimize(&mut x).unwrap();
        assert_relative_eq!(x, Vector::from_vec(vec![1.0, 2.0, 3.0, 4.0]), epsilon = 1e-4);
        assert!(f < 1e-7, "{algorithm}: f = {f}");
    }
}

#[test]
fn test_constrained_backends_without_derivatives() {
    // Only values are registered; gradient and Jacobian are estimated.
    let sys = OptimizerSystem::new(2).with_constraints(1, 1).unwrap();
    let constrained = [Algorithm::InteriorPoint, Algorithm::CFSQP];
    for algorithm in constrained.into_iter().filter(|&a| is_available(a)) {
        let mut backend = create_backend(algorithm, &sys).unwrap();
        backend.core_mut().callbacks_mut().set_objective(shifted_quadratic);
        backend.core_mut().callbacks_mut().set_constraint(unit_sum_constraint);
        backend.set_differentiator_method(DifferentiationMethod::Central);
        backend.set_convergence_tolerance(1e-6);

        let mut x = Vector::from_vec(vec![0.5, 0.5]);
        let f = backend.optimize(&mut x).unwrap();
        assert_relative_eq!(x[0], 0.0, epsilon = 1e-4);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-4);
        assert_relative_eq!(f, 2.0, epsilon = 1e-4);
    }
}

#[test]
fn test_analytic_jacobian_matches_numerical_solution() {
    let sys = OptimizerSystem::new(2).with_constraints(1, 1).unwrap();
    let mut solutions = Vec::new();
    for analytic in [true, false] {
        let mut backend = create_backend(Algorithm::InteriorPoint, &sys).unwrap();
        let callbacks = backend.core_mut().callbacks_mut();
        callbacks.set_objective(shifted_quadratic);
        callbacks.set_gradient(shifted_quadratic_gradient);
        callbacks.set_constraint(unit_sum_constraint);
        if analytic {
            callbacks.set_constraint_jacobian(unit_sum_jacobian);
        }
        backend.set_convergence_tolerance(1e-6);
        let mut x = Vector::zeros(2);
        backend.optimize(&mut x).unwrap();
        solutions.push(x);
    }
    assert_relative_eq!(solutions[0], solutions[1], epsilon = 1e-4);
}

#[test]
fn test_verbose_diagnostics_do_not_change_the_result() {
    let sys = OptimizerSystem::new(3);
    let mut results = Vec::new();
    for level in [0, 3] {
        let mut backend = create_backend(Algorithm::LBFGS, &sys).unwrap();
        backend.core_mut().callbacks_mut().set_objective(shifted_quadratic);
        backend.set_diagnostics_level(level);
        let mut x = Vector::zeros(3);
        let f = backend.optimize(&mut x).unwrap();
        results.push((x, f));
    }
    assert_eq!(results[0], results[1]);
}

#[test]
fn test_wrong_result_length() {
    let sys = OptimizerSystem::new(3);
    for algorithm in concrete_backends() {
        let mut backend = create_backend(algorithm, &sys).unwrap();
        backend.core_mut().callbacks_mut().set_objective(shifted_quadratic);
        assert!(matches!(
            backend.optimize(&mut Vector::zeros(2)),
            Err(OptimizerError::DimensionMismatch { .. })
        ));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_bounded_quadratic_lands_on_projection(
        target in prop::collection::vec(-3.0f64..3.0, 3),
        start in prop::collection::vec(-1.0f64..1.0, 3),
    ) {
        let lower = Vector::from_element(3, -1.0);
        let upper = Vector::from_element(3, 1.0);
        let sys = OptimizerSystem::new(3).with_limits(lower, upper).unwrap();
        let mut backend = create_backend(Algorithm::LBFGSB, &sys).unwrap();

        let objective_target = target.clone();
        backend.core_mut().callbacks_mut().set_objective(move |_, x, _, f| {
            *f = x.iter().zip(&objective_target).map(|(xi, ti)| (xi - ti).powi(2)).sum();
            CALLBACK_SUCCESS
        });
        let gradient_target = target.clone();
        backend.core_mut().callbacks_mut().set_gradient(move |_, x, _, mut g| {
            for i in 0..x.len() {
                g[i] = 2.0 * (x[i] - gradient_target[i]);
            }
            CALLBACK_SUCCESS
        });
        backend.set_convergence_tolerance(1e-7);

        let mut x = Vector::from_vec(start);
        backend.optimize(&mut x).unwrap();
        for i in 0..3 {
            prop_assert!((x[i] - target[i].clamp(-1.0, 1.0)).abs() < 1e-6);
        }
    }
}
