//! Levenberg-Marquardt fits of composed models.

use approx::assert_relative_eq;
use meal_rs::axis::Axis;
use meal_rs::error::{ErrorKind, MealError};
use meal_rs::estimate::Estimate;
use meal_rs::lm::{fit, Convergence, LevenbergMarquardt, LmConfig};
use meal_rs::model::{share, Evaluable, Function, Shared};
use meal_rs::models::{math, Phase, ScalarArgument, ScalarMath, ScalarParameter};
use meal_rs::rules::{Cast, Product, Sum};
use meal_rs::snapshot::Snapshot;
use num_complex::Complex64;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const SIGMA: f64 = 0.05;

#[test]
fn test_sine_amplitude_fit() {
    // y = 3 sin(2 x) + noise, fitting the amplitude with the frequency fixed
    let axis = Axis::new(0.0);
    let amplitude = ScalarParameter::new("amplitude", 1.0);
    let frequency = ScalarParameter::fixed("frequency", 2.0);
    let x = ScalarMath::from(share(ScalarArgument::new(&axis)));
    let model = (ScalarMath::from(amplitude.alias()) * math::sin(ScalarMath::from(frequency) * x)).into_model();
    assert_eq!(model.nparam(), 2);

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, SIGMA).unwrap();
    let xs: Vec<f64> = (0..200).map(|i| -1.0 + 2.0 * i as f64 / 199.0).collect();
    let y: Vec<Estimate<f64>> = xs
        .iter()
        .map(|x| Estimate::new(3.0 * (2.0 * x).sin() + noise.sample(&mut rng), SIGMA * SIGMA))
        .collect();
    let x = axis.values(xs);

    let mut lm = LevenbergMarquardt::new();
    let result = fit(&mut lm, &x, &y, &*model, &Convergence::default()).unwrap();

    assert!(result.status.is_converged(), "{}", result);
    assert_eq!(result.nfree, 1);
    assert_eq!(result.ndof(), 199);

    let reduced = result.reduced_chisq();
    assert!((0.5..=1.5).contains(&reduced), "reduced chisq {}", reduced);

    let fitted = amplitude.estimate(0).unwrap();
    assert!(fitted.var > 0.0);
    assert_eq!(fitted.var, result.covariance[[0, 0]]);
    assert!(
        (fitted.val - 3.0).abs() < 3.0 * fitted.error(),
        "amplitude {} is not within 3 sigma of 3.0",
        fitted
    );

    // the fixed frequency has not moved and carries no variance
    assert_eq!(model.param(1).unwrap(), 2.0);
    assert_eq!(model.variance(1).unwrap(), 0.0);
}

#[test]
fn test_degenerate_fit_fails() {
    // only a + b is observable
    let mut sum = Sum::new();
    sum.add_model(share(ScalarParameter::new("a", 1.0)));
    sum.add_model(share(ScalarParameter::new("b", 1.0)));

    let x = vec![(); 10];
    let y = vec![Estimate::new(4.0, 0.01); 10];

    let mut lm = LevenbergMarquardt::new();
    let convergence = Convergence::new().with_max_iterations(3);
    let err = fit(&mut lm, &x, &y, &sum, &convergence).unwrap_err();

    assert!(err.is_numerical());
    assert_eq!(err.kind(), ErrorKind::NumericalFailure);
    match err {
        MealError::SingularMatrix { degenerate, .. } => {
            assert_eq!(degenerate, vec!["a and b".to_string()]);
        }
        other => panic!("Expected SingularMatrix, got {:?}", other),
    }

    // fixing one of them makes the fit well posed
    sum.set_infit(1, false).unwrap();
    let result = fit(&mut lm, &x, &y, &sum, &Convergence::default()).unwrap();
    assert_relative_eq!(sum.evaluate(None).unwrap(), 4.0, epsilon = 1e-6);
    assert_eq!(result.covariance[[1, 1]], 0.0);
}

#[test]
fn test_misconfigured_fit_is_not_numerical() {
    let model = ScalarParameter::fixed("a", 1.0);
    let x = vec![(); 3];
    let y = vec![Estimate::new(1.0, 1.0); 3];

    let mut lm = LevenbergMarquardt::new();
    let err = fit(&mut lm, &x, &y, &model, &Convergence::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(!err.is_numerical());

    let err = fit(&mut lm, &x[..2], &y, &ScalarParameter::new("b", 0.0), &Convergence::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);
}

#[test]
fn test_complex_fit() {
    // gain * exp(i phase) observed directly
    let gain = ScalarParameter::new("gain", 1.0);
    let phase = Phase::new(0.0);
    let mut model = Product::<Complex64>::new();
    model.add_model(share(Cast::<f64, Complex64>::new(share(gain.alias()))));
    model.add_model(share(phase));

    let target = Complex64::from_polar(2.0, 0.5);
    let x = vec![(); 8];
    let y = vec![Estimate::new(target, 0.01); 8];

    let mut lm = LevenbergMarquardt::<Complex64>::new();
    let result = fit(&mut lm, &x, &y, &model, &Convergence::default()).unwrap();

    assert_relative_eq!(gain.param(0).unwrap(), 2.0, epsilon = 1e-6);
    assert_relative_eq!(model.param(1).unwrap(), 0.5, epsilon = 1e-6);
    assert_eq!(result.nfree, 2);
    // gain and phase errors are independent for a single complex value
    assert!(result.covariance[[0, 1]].abs() < 1e-9);
}

#[cfg(feature = "matrix")]
#[test]
fn test_jones_fit() {
    use meal_rs::element::Jones;
    use meal_rs::models::{Boost, Rotation};

    let build = |angle: f64, beta: f64| {
        let mut product = Product::<Jones>::new();
        product.add_model(share(Rotation::new([0.0, 0.0, 1.0], angle).unwrap()));
        product.add_model(share(Boost::new([1.0, 0.0, 0.0], beta).unwrap()));
        product
    };

    let target = build(0.3, 0.2).evaluate(None).unwrap();
    let model = build(0.0, 0.0);

    let x = vec![(); 4];
    let y = vec![Estimate::new(target, 1e-4); 4];

    let mut lm = LevenbergMarquardt::<Jones>::new();
    let result = fit(&mut lm, &x, &y, &model, &Convergence::default()).unwrap();

    assert_relative_eq!(model.param(0).unwrap(), 0.3, epsilon = 1e-6);
    assert_relative_eq!(model.param(1).unwrap(), 0.2, epsilon = 1e-6);
    assert!(result.chisq < 1e-12);
}

#[test]
fn test_fit_can_be_reset_from_snapshot() {
    let axis = Axis::new(0.0);
    let offset = ScalarParameter::new("offset", 0.0);
    let slope = ScalarParameter::new("slope", 0.0);
    let line = ScalarMath::from(offset) + ScalarMath::from(slope) * ScalarMath::from(share(ScalarArgument::new(&axis)));
    let model: Shared<f64> = line.into_model();

    let initial = Snapshot::capture(&*model).unwrap();

    let x = axis.values(vec![0.0, 1.0, 2.0]);
    let y = vec![Estimate::new(1.0, 1.0), Estimate::new(3.0, 1.0), Estimate::new(5.0, 1.0)];

    let config = LmConfig::from_json(r#"{ "lamda": 0.01 }"#).unwrap();
    let mut lm = LevenbergMarquardt::with_config(config);
    let first = fit(&mut lm, &x, &y, &*model, &Convergence::default()).unwrap();
    assert_relative_eq!(model.param(1).unwrap(), 2.0, epsilon = 1e-6);

    initial.restore(&*model).unwrap();
    assert_eq!(model.param(1).unwrap(), 0.0);
    assert_eq!(model.variance(1).unwrap(), 0.0);

    // the same starting point gives the same answer
    let second = fit(&mut lm, &x, &y, &*model, &Convergence::default()).unwrap();
    assert_eq!(first.chisq, second.chisq);
    assert_eq!(first.iterations, second.iterations);
}

#[test]
fn test_verbose_fit_logs_and_matches_quiet_fit() {
    let build = || {
        let mut sum = Sum::new();
        sum.add_model(share(ScalarParameter::new("offset", 0.0)));
        sum
    };
    let x = vec![(); 5];
    let y: Vec<_> = [1.0, 1.2, 0.8, 1.1, 0.9]
        .iter()
        .map(|v| Estimate::new(*v, 0.04))
        .collect();

    let quiet = build();
    let mut lm = LevenbergMarquardt::new();
    let expected = fit(&mut lm, &x, &y, &quiet, &Convergence::default()).unwrap();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();

    let loud = build();
    let result = tracing::subscriber::with_default(subscriber, || {
        let mut lm = LevenbergMarquardt::new().with_verbose(3);
        fit(&mut lm, &x, &y, &loud, &Convergence::default()).unwrap()
    });

    assert_eq!(result.chisq, expected.chisq);
    assert_relative_eq!(loud.param(0).unwrap(), 1.0, epsilon = 1e-5);
}
