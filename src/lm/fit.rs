//! Fit driver.
//!
//! [`fit`] runs the solver to convergence, writes the variances from the
//! covariance diagonal back into the model and collects the outcome.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::axis::Abscissa;
use crate::element::Element;
use crate::error::Result;
use crate::estimate::Estimate;
use crate::model::Evaluable;

use super::algorithm::LevenbergMarquardt;
use super::convergence::{Convergence, ConvergenceStatus};

/// Outcome of a converged fit.
///
/// Serializes to JSON with [`Fit::to_json`], matrices included, so that a
/// caller can propagate correlated errors later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fit {
    /// Best chi-squared
    pub chisq: f64,

    /// Number of free parameters
    pub nfree: usize,

    /// Number of data points
    pub ndat: usize,

    /// Number of iterations performed
    pub iterations: usize,

    /// Why the iterations stopped
    pub status: ConvergenceStatus,

    /// Covariance matrix of the parameters, zero for fixed parameters
    pub covariance: Array2<f64>,

    /// Curvature matrix at the best fit
    pub curvature: Array2<f64>,

    /// Best-fit value and variance of every parameter
    pub estimates: Vec<Estimate<f64>>,
}

impl Fit {
    /// Degrees of freedom, the number of data less the number of free parameters
    pub fn ndof(&self) -> usize {
        self.ndat.saturating_sub(self.nfree)
    }

    /// Chi-squared per degree of freedom; infinite without degrees of freedom
    pub fn reduced_chisq(&self) -> f64 {
        self.chisq / self.ndof() as f64
    }

    /// Serialize the fit as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a fit written by [`Fit::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for Fit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result:")?;
        writeln!(f, "  Status: {}", self.status.description())?;
        writeln!(f, "  Chi-squared: {:.6e}", self.chisq)?;
        writeln!(f, "  Reduced chi-squared: {:.4}", self.reduced_chisq())?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        for (index, estimate) in self.estimates.iter().enumerate() {
            writeln!(f, "  [{}] {}", index, estimate)?;
        }
        Ok(())
    }
}

/// Fit `model` to the data `y` at the abscissas `x`.
///
/// The model is left at the best fit with variances taken from the
/// covariance diagonal.
///
/// # Errors
///
/// Any error of [`LevenbergMarquardt::init`], [`LevenbergMarquardt::iter`]
/// or [`LevenbergMarquardt::result`]. Use [`crate::MealError::is_numerical`]
/// to tell a singular fit from a misconfigured one.
pub fn fit<X, G, M>(
    lm: &mut LevenbergMarquardt<G>,
    x: &[X],
    y: &[Estimate<G>],
    model: &M,
    convergence: &Convergence,
) -> Result<Fit>
where
    X: Abscissa,
    G: Element,
    M: Evaluable<Result = G> + ?Sized,
{
    let mut chisq = lm.init(x, y, model)?;
    let mut iterations = 0;
    let mut not_improving = 0;

    let status = loop {
        let trial = lm.iter(x, y, model)?;
        iterations += 1;

        let improvement = if trial < chisq {
            let previous = chisq;
            chisq = trial;
            not_improving = 0;
            Some((previous - trial) / previous)
        } else {
            not_improving += 1;
            None
        };

        // an exact fit cannot improve further
        if chisq == 0.0 {
            break ConvergenceStatus::Converged;
        }

        let status = convergence.check(iterations, not_improving, improvement);
        if status.is_terminated() {
            break status;
        }
    };

    let result = lm.result(model)?;

    let nparam = model.nparam();
    let mut estimates = Vec::with_capacity(nparam);
    for index in 0..nparam {
        model.set_variance(index, result.covariance[[index, index]])?;
        estimates.push(model.estimate(index)?);
    }

    if lm.config().verbose >= 1 {
        info!(
            model = %model.name(),
            chisq = result.chisq,
            iterations,
            status = %status.description(),
            "fit"
        );
    }

    Ok(Fit {
        chisq: result.chisq,
        nfree: result.nfree,
        ndat: y.len(),
        iterations,
        status,
        covariance: result.covariance,
        curvature: result.curvature,
        estimates,
    })
}
