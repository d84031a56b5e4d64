//! # meal-rs
//!
//! `meal-rs` builds differentiable models out of smaller ones and fits them
//! to data with the Levenberg-Marquardt algorithm.
//!
//! The library provides:
//! - Leaf models with shared, named parameters and analytic gradients
//! - Composition rules (sums, products, inverses, chain rules, ...) that map
//!   the parameters of their children into a single index space
//! - Real, complex and 2x2 complex (Jones) matrix valued models
//! - A Levenberg-Marquardt solver generic over the model's result type
//!
//! ## Basic Usage
//!
//! ```
//! use meal_rs::axis::Axis;
//! use meal_rs::estimate::Estimate;
//! use meal_rs::lm::{fit, Convergence, LevenbergMarquardt};
//! use meal_rs::model::share;
//! use meal_rs::models::{math, ScalarArgument, ScalarMath, ScalarParameter};
//! use meal_rs::Function;
//!
//! // y = amplitude * sin(2 x)
//! let axis = Axis::new(0.0);
//! let amplitude = ScalarParameter::new("amplitude", 1.0);
//! let x = ScalarMath::from(share(ScalarArgument::new(&axis)));
//! let model = (ScalarMath::from(amplitude.alias()) * math::sin(x * 2.0)).into_model();
//!
//! let xs: Vec<f64> = (0..50).map(|i| -1.0 + 0.04 * i as f64).collect();
//! let data: Vec<_> = xs
//!     .iter()
//!     .map(|x| Estimate::new(3.0 * (2.0 * x).sin(), 0.01))
//!     .collect();
//!
//! let mut lm = LevenbergMarquardt::new();
//! let result = fit(&mut lm, &axis.values(xs), &data, &*model, &Convergence::default()).unwrap();
//!
//! assert!((amplitude.param(0).unwrap() - 3.0).abs() < 1e-6);
//! assert_eq!(result.nfree, 1);
//! ```

pub mod axis;
pub mod composite;
pub mod element;
pub mod error;
pub mod estimate;
pub mod lm;
pub mod model;
pub mod models;
pub mod parameters;
pub mod rules;
pub mod snapshot;
pub mod utils;

// Re-exports for convenience
pub use axis::{Abscissa, Axis, AxisValue};
pub use composite::{Composite, Project};
pub use element::{Element, Embed};
#[cfg(feature = "matrix")]
pub use element::Jones;
pub use error::{ErrorKind, MealError, Result, ResultExt};
pub use estimate::Estimate;
pub use lm::{fit, Convergence, Fit, LevenbergMarquardt, LmConfig};
pub use model::{evaluate_estimate, share, Evaluable, Function, Shared};
pub use parameters::{Parameter, ParameterBlock, ParameterPolicy};
pub use snapshot::Snapshot;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
