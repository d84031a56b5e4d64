//! Convergence criteria for the fit driver.
//!
//! The solver itself never decides when to stop; [`Convergence`] encodes the
//! usual rule of stopping once chi-squared improves by less than a relative
//! threshold, or has failed to improve for a number of consecutive iterations.

use serde::{Deserialize, Serialize};

/// Possible states of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The fit is still running.
    Running,

    /// The relative improvement in chi-squared fell below the threshold.
    Converged,

    /// Chi-squared did not improve for the allowed number of iterations.
    NotImproving,

    /// The fit reached the maximum number of iterations.
    MaxIterationsReached,
}

impl ConvergenceStatus {
    /// Returns true if the fit has terminated.
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the fit stopped at a minimum.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::Converged | ConvergenceStatus::NotImproving
        )
    }

    /// Returns a description of the status.
    pub fn description(&self) -> String {
        match self {
            ConvergenceStatus::Running => "Fit is still running".to_string(),
            ConvergenceStatus::Converged => {
                "Converged: small relative change in chi-squared".to_string()
            }
            ConvergenceStatus::NotImproving => {
                "Converged: chi-squared stopped improving".to_string()
            }
            ConvergenceStatus::MaxIterationsReached => {
                "Terminated: maximum iterations reached".to_string()
            }
        }
    }
}

/// When to stop iterating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Convergence {
    /// Maximum number of iterations. Default: 100
    pub max_iterations: usize,

    /// Consecutive iterations without improvement before stopping. Default: 25
    pub max_not_improving: usize,

    /// Relative chi-squared improvement below which the fit has converged. Default: 1e-3
    pub threshold: f64,
}

impl Default for Convergence {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_not_improving: 25,
            threshold: 1e-3,
        }
    }
}

impl Convergence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_not_improving(mut self, max_not_improving: usize) -> Self {
        self.max_not_improving = max_not_improving;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Decide whether to continue after an iteration.
    ///
    /// `improvement` is the relative decrease in chi-squared of the latest
    /// iteration, or `None` if the iteration did not improve the fit.
    pub fn check(
        &self,
        iterations: usize,
        not_improving: usize,
        improvement: Option<f64>,
    ) -> ConvergenceStatus {
        if let Some(relative) = improvement {
            if relative > 0.0 && relative < self.threshold {
                return ConvergenceStatus::Converged;
            }
        }

        if not_improving >= self.max_not_improving {
            ConvergenceStatus::NotImproving
        } else if iterations >= self.max_iterations {
            ConvergenceStatus::MaxIterationsReached
        } else {
            ConvergenceStatus::Running
        }
    }
}
