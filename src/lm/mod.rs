//! Levenberg-Marquardt least-squares fitting.
//!
//! This module provides a Levenberg-Marquardt solver for any [`Evaluable`]
//! model, following the damped normal equations of Numerical Recipes §15.5.
//! The solver weights each datum by the inverse of its variance and handles
//! real, complex and Jones-matrix data alike.
//!
//! ```rust
//! use meal_rs::axis::Axis;
//! use meal_rs::estimate::Estimate;
//! use meal_rs::lm::{fit, Convergence, LevenbergMarquardt};
//! use meal_rs::models::Polynomial;
//! use meal_rs::Function;
//!
//! let axis = Axis::new(0.0);
//! let line = Polynomial::new(2, &axis).unwrap();
//!
//! let x = axis.values(vec![0.0, 1.0, 2.0, 3.0]);
//! let y: Vec<_> = [1.1, 2.9, 5.1, 6.9]
//!     .iter()
//!     .map(|&y| Estimate::new(y, 0.01))
//!     .collect();
//!
//! let mut lm = LevenbergMarquardt::new();
//! let result = fit(&mut lm, &x, &y, &line, &Convergence::default()).unwrap();
//!
//! assert!((line.param(1).unwrap() - 1.96).abs() < 1e-3);
//! assert_eq!(result.nfree, 2);
//! ```
//!
//! [`Evaluable`]: crate::model::Evaluable

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod fit;
pub mod gauss_jordan;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{Convergence, ConvergenceStatus};
pub use fit::{fit, Fit};
pub use gauss_jordan::gauss_jordan;
