//! Algebraic properties of composed models.

use std::rc::Rc;

use approx::assert_relative_eq;
use meal_rs::axis::{Abscissa, Axis};
use meal_rs::element::Element;
use meal_rs::error::ErrorKind;
use meal_rs::model::{share, Evaluable, Function, Shared};
use meal_rs::models::{
    Phase, Polynomial, ScalarArgument, ScalarMath, ScalarParameter, UnaryFunction, UnaryScalar,
};
use meal_rs::rules::{
    difference, quotient, Cached, Cast, ChainRule, Inverse, Negation, Product, Sum, VectorRule,
};
use num_complex::Complex64;

fn param(name: &str, value: f64) -> Shared<f64> {
    share(ScalarParameter::new(name, value))
}

fn sum_with_negation<R: Element>(a: Shared<R>) -> (R, Vec<R>) {
    let mut sum = Sum::<R>::new();
    sum.add_model(Rc::clone(&a));
    sum.add_model(share(Negation::new(a)));

    let mut gradient = Vec::new();
    let value = sum.evaluate(Some(&mut gradient)).unwrap();
    (value, gradient)
}

fn product_with_inverse<R: Element>(a: Shared<R>) -> R {
    let mut product = Product::<R>::new();
    product.add_model(Rc::clone(&a));
    product.add_model(share(Inverse::new(a)));
    product.evaluate(None).unwrap()
}

fn assert_near<R: Element>(a: &R, b: &R) {
    let error = (a.clone() + (-b.clone())).norm_sqr();
    assert!(error < 1e-24, "{:?} != {:?}", a, b);
}

#[test]
fn test_group_identities_scalar() {
    let axis = Axis::new(0.7);
    let mut a = Product::new();
    a.add_model(param("x", -1.3));
    a.add_model(share(Polynomial::with_coefficients(&[0.5, 2.0], &axis).unwrap()));
    let a: Shared<f64> = Rc::new(a);

    let (value, gradient) = sum_with_negation(Rc::clone(&a));
    assert_eq!(value, 0.0);
    assert_eq!(gradient.len(), a.nparam());
    assert!(gradient.iter().all(|g| *g == 0.0));

    assert_near(&product_with_inverse(a), &1.0);
}

#[test]
fn test_group_identities_complex() {
    let mut a = Product::<Complex64>::new();
    a.add_model(share(Cast::<f64, Complex64>::new(param("gain", 0.8))));
    a.add_model(share(Phase::new(2.1)));
    let a: Shared<Complex64> = Rc::new(a);

    let (value, gradient) = sum_with_negation(Rc::clone(&a));
    assert_eq!(value, Complex64::new(0.0, 0.0));
    assert!(gradient.iter().all(|g| g.norm_sqr() == 0.0));

    assert_near(&product_with_inverse(a), &Complex64::new(1.0, 0.0));
}

#[cfg(feature = "matrix")]
#[test]
fn test_group_identities_jones() {
    use meal_rs::element::Jones;
    use meal_rs::models::{Boost, Rotation};

    let mut a = Product::<Jones>::new();
    a.add_model(share(Boost::new([0.0, 1.0, 0.0], 0.4).unwrap()));
    a.add_model(share(Rotation::new([1.0, 0.0, 0.0], 1.2).unwrap()));
    let a: Shared<Jones> = Rc::new(a);

    let (value, _) = sum_with_negation(Rc::clone(&a));
    assert_eq!(value, Jones::zeros());

    assert_near(&product_with_inverse(a), &Jones::identity());
}

#[test]
fn test_difference_and_quotient() {
    let a = param("a", 6.0);
    let b = param("b", 4.0);

    let diff = difference(Rc::clone(&a), Rc::clone(&b));
    let mut gradient = Vec::new();
    assert_relative_eq!(diff.evaluate(Some(&mut gradient)).unwrap(), 2.0);
    assert_eq!(gradient, vec![1.0, -1.0]);

    let ratio = quotient(a, b);
    assert_relative_eq!(ratio.evaluate(Some(&mut gradient)).unwrap(), 1.5);
    assert_relative_eq!(gradient[0], 0.25);
    assert_relative_eq!(gradient[1], -6.0 / 16.0);
}

#[test]
fn test_projection_aliasing() {
    // first = a * x, second = a + c, with a shared by both
    let a = param("a", 1.5);
    let x = param("x", -2.0);
    let c = param("c", 0.25);

    let mut first = Product::new();
    first.add_model(Rc::clone(&a));
    first.add_model(x);
    let first: Shared<f64> = Rc::new(first);

    let mut second = Sum::new();
    second.add_model(Rc::clone(&a));
    second.add_model(c);
    let second: Shared<f64> = Rc::new(second);

    let mut parent = Sum::new();
    parent.add_model(Rc::clone(&first));
    parent.add_model(Rc::clone(&second));
    assert_eq!(parent.nparam(), 3);
    assert_eq!(parent.param_name(0).unwrap(), "a");
    assert_eq!(parent.param_name(2).unwrap(), "c");

    let mut g_first = Vec::new();
    let mut g_second = Vec::new();
    let mut g_parent = Vec::new();
    first.evaluate(Some(&mut g_first)).unwrap();
    second.evaluate(Some(&mut g_second)).unwrap();
    parent.evaluate(Some(&mut g_parent)).unwrap();

    // a is index 0 in every one of them
    assert_eq!(g_parent[0], g_first[0] + g_second[0]);
    assert_eq!(g_parent[1], g_first[1]);
    assert_eq!(g_parent[2], g_second[1]);

    // and it moves with a single parameter
    parent.set_param(0, 2.0).unwrap();
    assert_eq!(a.param(0).unwrap(), 2.0);
    assert_eq!(first.param(0).unwrap(), 2.0);

    // perturbing the shared parameter changes the parent by the summed gradient
    let h = 1e-6;
    let before = parent.evaluate(Some(&mut g_parent)).unwrap();
    parent.set_param(0, 2.0 + h).unwrap();
    let after = parent.evaluate(None).unwrap();
    assert_relative_eq!((after - before) / h, g_parent[0], epsilon = 1e-6);
}

#[test]
fn test_chain_rule_composition() {
    // M(a, c) = sin(a) * c, with a = f(b) = 2 b
    let a = param("a", 0.0);
    let c = param("c", 1.7);
    let mut model = Product::new();
    model.add_model(share(UnaryScalar::new(UnaryFunction::Sine, Rc::clone(&a))));
    model.add_model(Rc::clone(&c));
    let model: Shared<f64> = Rc::new(model);

    let b = ScalarParameter::new("b", 0.0);
    let mut rule = ChainRule::<f64>::new();
    rule.set_model(Rc::clone(&model)).unwrap();
    rule.set_constraint(0, (ScalarMath::from(b.alias()) * 2.0).into_model())
        .unwrap();

    let ib = (0..rule.nparam())
        .find(|&i| rule.param_name(i).unwrap() == "b")
        .unwrap();

    for value in [-1.0, -0.2, 0.0, 0.35, 1.4] {
        b.set_param(0, value).unwrap();

        let mut chained = Vec::new();
        let result = rule.evaluate(Some(&mut chained)).unwrap();
        assert_eq!(a.param(0).unwrap(), 2.0 * value);

        let mut direct = Vec::new();
        assert_eq!(model.evaluate(Some(&mut direct)).unwrap(), result);

        // dM/db = dM/da * 2
        assert_relative_eq!(chained[ib], direct[0] * 2.0, epsilon = 1e-15);
    }
}

#[test]
fn test_idempotent_evaluation() {
    let axis = Axis::new(0.3);
    let x = ScalarMath::from(share(ScalarArgument::new(&axis)));
    let amplitude = ScalarMath::from(ScalarParameter::new("amplitude", 1.1));
    let model = (amplitude * meal_rs::models::math::cos(x.clone() * 3.0) / (x + 2.0)).into_model();

    let mut first = Vec::new();
    let mut second = Vec::new();
    let v1 = model.evaluate(Some(&mut first)).unwrap();
    let v2 = model.evaluate(Some(&mut second)).unwrap();

    assert_eq!(v1.to_bits(), v2.to_bits());
    let bits = |g: &[f64]| g.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));

    let cached = Cached::new(Polynomial::with_coefficients(&[1.0, -0.5, 0.25], &axis).unwrap());
    let c1 = cached.evaluate(Some(&mut first)).unwrap();
    let c2 = cached.evaluate(Some(&mut second)).unwrap();
    assert_eq!(c1.to_bits(), c2.to_bits());
    assert_eq!(bits(&first), bits(&second));
    assert_eq!(cached.hits(), 1);

    // moving the axis invalidates the memo
    axis.value(0.4).apply();
    assert_ne!(cached.evaluate(None).unwrap(), c1);
    assert_eq!(cached.hits(), 1);
}

#[test]
fn test_error_traces_through_tree() {
    let mut inner = Product::new();
    inner.add_model(param("a", 2.0));
    inner.add_model(share(UnaryScalar::new(
        UnaryFunction::Logarithm,
        param("x", -1.0),
    )));

    let mut outer = Sum::new();
    outer.add_model(param("b", 1.0));
    outer.add_model(Rc::new(inner));

    let err = outer.evaluate(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);
    assert!(!err.is_numerical());

    let text = format!("{}", err);
    let inner_at = text.find("Product<Scalar>::calculate").unwrap();
    let outer_at = text.find("Sum<Scalar>::calculate").unwrap();
    assert!(inner_at < outer_at, "{}", text);

    let mut unconfigured = Sum::new();
    unconfigured.add_model(share(ChainRule::<f64>::new()));
    let err = unconfigured.evaluate(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn test_vector_rule_selection() {
    let mut vector = VectorRule::<f64>::new();
    vector.push_back(param("a", 1.0));
    vector.push_back(param("b", 2.0));
    assert_eq!(vector.index(), 1);

    let mut gradient = Vec::new();
    assert_eq!(vector.evaluate(Some(&mut gradient)).unwrap(), 2.0);
    assert_eq!(gradient, vec![0.0, 1.0]);

    vector.set_index(0).unwrap();
    assert_eq!(vector.evaluate(Some(&mut gradient)).unwrap(), 1.0);
    assert_eq!(gradient, vec![1.0, 0.0]);

    let err = vector.set_index(2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    assert_eq!(vector.index(), 0);

    let empty = VectorRule::<f64>::new();
    assert_eq!(empty.evaluate(None).unwrap_err().kind(), ErrorKind::InvalidState);
}
