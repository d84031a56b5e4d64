//! Built-in leaf models and the scalar expression builder.
//!
//! This module provides the generic leaves from which composed models are
//! built: scalars, constants, axis values, polynomials, elementary
//! functions, a complex phase, phase gradients of an axis and (with the
//! `matrix` feature) the Jones matrices of rotations and boosts.

pub mod functions;
#[cfg(feature = "matrix")]
pub mod jones;
pub mod math;
pub mod phase;
pub mod phase_gradients;
pub mod polynomial;
pub mod scalar;

// Re-export the models
pub use functions::{BinaryFunction, BinaryScalar, UnaryFunction, UnaryScalar};
#[cfg(feature = "matrix")]
pub use jones::{Boost, Rotation};
pub use math::ScalarMath;
pub use phase::Phase;
pub use phase_gradients::PhaseGradients;
pub use polynomial::Polynomial;
pub use scalar::{ScalarArgument, ScalarParameter, ScalarValue};
