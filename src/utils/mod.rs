//! Utility functions for verifying and exercising models.

pub mod finite_difference;
pub mod random;

// Re-export commonly used utilities
pub use finite_difference::{check_gradient, numerical_gradient};
pub use random::randomize_parameters;
