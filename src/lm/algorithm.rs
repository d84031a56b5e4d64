//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! The solver is driven externally in three phases: [`LevenbergMarquardt::init`]
//! computes the initial chi-squared and curvature, each call to
//! [`LevenbergMarquardt::iter`] attempts one damped Gauss-Newton step, and
//! [`LevenbergMarquardt::result`] solves the undamped normal equations for the
//! covariance matrix. Nothing is held between calls that needs releasing, so a
//! caller may stop after any iteration.
//!
//! The solver is generic over the kind of value the model returns: residuals
//! and gradients are combined with [`Element::inner`], so scalar, complex and
//! Jones-matrix data are all fitted the same way.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, trace, warn};

use crate::axis::Abscissa;
use crate::element::Element;
use crate::error::{MealError, Result};
use crate::estimate::Estimate;
use crate::model::Evaluable;

use super::config::LmConfig;
use super::gauss_jordan::gauss_jordan;

/// Rows whose normalized inner product is this close to ±1 are reported as degenerate.
const DEGENERACY_TOLERANCE: f64 = 1e-3;

/// Covariance and curvature at the best fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmResult {
    /// Inverse of the curvature restricted to the free parameters, zero elsewhere
    pub covariance: Array2<f64>,

    /// Curvature matrix (half the Hessian of chi-squared) at the best fit
    pub curvature: Array2<f64>,

    /// Best chi-squared found
    pub chisq: f64,

    /// Number of free parameters
    pub nfree: usize,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Levenberg-Marquardt Result:")?;
        writeln!(f, "  Chi-squared: {:.6e}", self.chisq)?;
        writeln!(f, "  Free parameters: {}", self.nfree)?;
        writeln!(f, "  Covariance: {:?}", self.covariance)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt solver for models returning `G`.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt<G: Element = f64> {
    /// Configuration options
    config: LmConfig,

    /// Current damping factor
    lamda: f64,

    /// Number of parameters seen by `init`, or `None` before the first call
    nparam: Option<usize>,

    /// Curvature and gradient of the latest trial
    alpha: Array2<f64>,
    beta: Array1<f64>,

    /// Curvature, gradient and chi-squared of the best fit so far
    best_alpha: Array2<f64>,
    best_beta: Array1<f64>,
    best_chisq: f64,

    /// Step of the latest solve, zero for fixed parameters
    delta: Array1<f64>,

    /// Parameter values before the latest trial step
    backup: Vec<f64>,

    /// Model gradient at one datum
    gradient: Vec<G>,
}

impl<G: Element> LevenbergMarquardt<G> {
    /// Create a new solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(LmConfig::default())
    }

    /// Create a new solver with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self {
            lamda: config.lamda,
            config,
            nparam: None,
            alpha: Array2::zeros((0, 0)),
            beta: Array1::zeros(0),
            best_alpha: Array2::zeros((0, 0)),
            best_beta: Array1::zeros(0),
            best_chisq: f64::INFINITY,
            delta: Array1::zeros(0),
            backup: Vec::new(),
            gradient: Vec::new(),
        }
    }

    /// Set the initial damping factor.
    pub fn with_lamda(mut self, lamda: f64) -> Self {
        self.config.lamda = lamda;
        self.lamda = lamda;
        self
    }

    /// Set the factor applied to lamda after a rejected step.
    pub fn with_lamda_increase_factor(mut self, factor: f64) -> Self {
        self.config.lamda_increase_factor = factor;
        self
    }

    /// Set the factor applied to lamda after an accepted step.
    pub fn with_lamda_decrease_factor(mut self, factor: f64) -> Self {
        self.config.lamda_decrease_factor = factor;
        self
    }

    /// Set the smallest pivot accepted by the linear solver.
    pub fn with_singular_threshold(mut self, threshold: f64) -> Self {
        self.config.singular_threshold = threshold;
        self
    }

    /// Set the diagnostic level (0 to 3).
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Current damping factor
    pub fn lamda(&self) -> f64 {
        self.lamda
    }

    /// Best chi-squared found since `init`
    pub fn best_chisq(&self) -> f64 {
        self.best_chisq
    }

    /// Curvature matrix at the best fit so far
    pub fn curvature(&self) -> &Array2<f64> {
        &self.best_alpha
    }

    /// Compute the initial chi-squared, curvature and gradient.
    ///
    /// # Errors
    ///
    /// * `MealError::InvalidParam` if `x` and `y` differ in length or a
    ///   datum has a variance that is not positive
    /// * any error raised while evaluating the model
    pub fn init<X, M>(&mut self, x: &[X], y: &[Estimate<G>], model: &M) -> Result<f64>
    where
        X: Abscissa,
        M: Evaluable<Result = G> + ?Sized,
    {
        // not initialised until the first chi-squared is stored
        self.nparam = None;
        self.best_chisq = f64::INFINITY;

        let nparam = model.nparam();
        self.lamda = self.config.lamda;
        self.alpha = Array2::zeros((nparam, nparam));
        self.beta = Array1::zeros(nparam);
        self.delta = Array1::zeros(nparam);
        self.backup.clear();

        let chisq = self.calculate_chisq(x, y, model)?;

        self.best_alpha = self.alpha.clone();
        self.best_beta = self.beta.clone();
        self.best_chisq = chisq;
        self.nparam = Some(nparam);

        if self.config.verbose >= 1 {
            info!(
                model = %model.name(),
                nparam,
                ndat = y.len(),
                chisq,
                "LevenbergMarquardt::init"
            );
        }

        Ok(chisq)
    }

    /// Attempt one damped step and return its chi-squared.
    ///
    /// The step is kept if it improves on the best chi-squared, in which case
    /// lamda shrinks; otherwise the parameters are restored and lamda grows.
    /// The returned value is the trial chi-squared either way.
    ///
    /// # Errors
    ///
    /// * `MealError::InvalidState` if called before `init` or the model's
    ///   parameter count has changed since
    /// * `MealError::NoFreeParameters` if every parameter is fixed
    /// * `MealError::SingularMatrix` if the damped curvature cannot be inverted
    pub fn iter<X, M>(&mut self, x: &[X], y: &[Estimate<G>], model: &M) -> Result<f64>
    where
        X: Abscissa,
        M: Evaluable<Result = G> + ?Sized,
    {
        let nparam = self.check_model(model)?;
        self.solve_delta(model)?;

        self.backup.clear();
        for index in 0..nparam {
            self.backup.push(model.param(index)?);
        }

        for index in 0..nparam {
            if self.delta[index] != 0.0 {
                model.set_param(index, self.backup[index] + self.delta[index])?;
            }
        }

        let chisq = match self.calculate_chisq(x, y, model) {
            Ok(chisq) => chisq,
            Err(error) => {
                self.restore(model)?;
                return Err(error);
            }
        };

        let accepted = chisq < self.best_chisq;
        if accepted {
            self.lamda *= self.config.lamda_decrease_factor;
            self.best_chisq = chisq;
            std::mem::swap(&mut self.best_alpha, &mut self.alpha);
            std::mem::swap(&mut self.best_beta, &mut self.beta);
        } else {
            self.lamda *= self.config.lamda_increase_factor;
            self.restore(model)?;
        }

        if self.config.verbose >= 2 {
            debug!(
                chisq,
                best_chisq = self.best_chisq,
                lamda = self.lamda,
                accepted,
                "LevenbergMarquardt::iter"
            );
        }

        Ok(chisq)
    }

    /// Solve the undamped normal equations at the best fit.
    ///
    /// # Errors
    ///
    /// * `MealError::SingularMatrix` if the curvature matrix is singular; the
    ///   error lists any pairs of parameters found to be degenerate
    /// * `MealError::NoFreeParameters` if every parameter is fixed
    pub fn result<M>(&mut self, model: &M) -> Result<LmResult>
    where
        M: Evaluable<Result = G> + ?Sized,
    {
        let nparam = self.check_model(model)?;

        let lamda = self.lamda;
        self.lamda = 0.0;
        let solved = self.solve_delta(model);
        self.lamda = lamda;
        let (inverse, free) = solved?;

        let mut covariance = Array2::zeros((nparam, nparam));
        for (r, &i) in free.iter().enumerate() {
            for (c, &j) in free.iter().enumerate() {
                covariance[[i, j]] = inverse[[r, c]];
            }
        }

        if self.config.verbose >= 1 {
            info!(
                chisq = self.best_chisq,
                nfree = free.len(),
                "LevenbergMarquardt::result"
            );
        }

        Ok(LmResult {
            covariance,
            curvature: self.best_alpha.clone(),
            chisq: self.best_chisq,
            nfree: free.len(),
        })
    }

    fn check_model<M>(&self, model: &M) -> Result<usize>
    where
        M: Evaluable<Result = G> + ?Sized,
    {
        let nparam = self.nparam.ok_or_else(|| {
            MealError::InvalidState("LevenbergMarquardt used before init".to_string())
        })?;
        if model.nparam() != nparam {
            return Err(MealError::InvalidState(format!(
                "LevenbergMarquardt model nparam={} changed since init nparam={}",
                model.nparam(),
                nparam
            )));
        }
        Ok(nparam)
    }

    fn restore<M>(&self, model: &M) -> Result<()>
    where
        M: Evaluable<Result = G> + ?Sized,
    {
        for (index, value) in self.backup.iter().enumerate() {
            model.set_param(index, *value)?;
        }
        Ok(())
    }

    /// Solve the damped normal equations over the free parameters.
    ///
    /// Fills `delta` and returns the inverse of the damped free sub-block
    /// together with the indices of the free parameters.
    fn solve_delta<M>(&mut self, model: &M) -> Result<(Array2<f64>, Vec<usize>)>
    where
        M: Evaluable<Result = G> + ?Sized,
    {
        let nparam = self.best_beta.len();
        let mut free = Vec::with_capacity(nparam);
        for index in 0..nparam {
            if model.infit(index)? {
                free.push(index);
            }
        }

        if free.is_empty() {
            return Err(MealError::NoFreeParameters);
        }

        let nfree = free.len();
        let mut a = Array2::zeros((nfree, nfree));
        let mut b = Array1::zeros(nfree);
        for (r, &i) in free.iter().enumerate() {
            for (c, &j) in free.iter().enumerate() {
                a[[r, c]] = self.best_alpha[[i, j]];
            }
            a[[r, r]] *= 1.0 + self.lamda;
            b[r] = self.best_beta[i];
        }

        match gauss_jordan(&mut a, &mut b, nfree, self.config.singular_threshold) {
            Ok(()) => {}
            Err(MealError::SingularMatrix { pivot, row, .. }) => {
                let degenerate = self.degenerate_pairs(model, &free)?;
                warn!(
                    pivot,
                    row,
                    lamda = self.lamda,
                    degenerate = ?degenerate,
                    "LevenbergMarquardt::solve_delta singular curvature matrix"
                );
                return Err(MealError::SingularMatrix {
                    pivot,
                    row,
                    degenerate,
                });
            }
            Err(error) => return Err(error),
        }

        self.delta.fill(0.0);
        for (r, &i) in free.iter().enumerate() {
            self.delta[i] = b[r];
        }

        Ok((a, free))
    }

    /// Names of the free parameter pairs whose curvature rows are parallel.
    fn degenerate_pairs<M>(&self, model: &M, free: &[usize]) -> Result<Vec<String>>
    where
        M: Evaluable<Result = G> + ?Sized,
    {
        let norms: Vec<f64> = free
            .iter()
            .map(|&i| {
                free.iter()
                    .map(|&k| self.best_alpha[[i, k]].powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();

        let mut degenerate = Vec::new();
        for (r, &i) in free.iter().enumerate() {
            if norms[r] == 0.0 {
                degenerate.push(format!("{} (no curvature)", model.param_name(i)?));
                continue;
            }
            for (c, &j) in free.iter().enumerate().skip(r + 1) {
                if norms[c] == 0.0 {
                    continue;
                }
                let dot: f64 = free
                    .iter()
                    .map(|&k| self.best_alpha[[i, k]] * self.best_alpha[[j, k]])
                    .sum();
                let cosine = dot / (norms[r] * norms[c]);
                if (1.0 - cosine.abs()).abs() < DEGENERACY_TOLERANCE {
                    degenerate.push(format!(
                        "{} and {}",
                        model.param_name(i)?,
                        model.param_name(j)?
                    ));
                }
            }
        }

        Ok(degenerate)
    }

    /// Accumulate chi-squared, curvature and gradient over every datum.
    fn calculate_chisq<X, M>(&mut self, x: &[X], y: &[Estimate<G>], model: &M) -> Result<f64>
    where
        X: Abscissa,
        M: Evaluable<Result = G> + ?Sized,
    {
        let nparam = self.alpha.nrows();
        if model.nparam() != nparam || self.alpha.ncols() != nparam {
            return Err(MealError::InvalidState(format!(
                "LevenbergMarquardt::calculate_chisq alpha={:?} but model nparam={}",
                self.alpha.dim(),
                model.nparam()
            )));
        }

        if x.len() != y.len() {
            return Err(MealError::InvalidParam(format!(
                "LevenbergMarquardt::calculate_chisq x.len()={} != y.len()={}",
                x.len(),
                y.len()
            )));
        }

        let mut infit = Vec::with_capacity(nparam);
        for index in 0..nparam {
            infit.push(model.infit(index)?);
        }

        self.alpha.fill(0.0);
        self.beta.fill(0.0);
        let mut chisq = 0.0;

        for (datum, (abscissa, data)) in x.iter().zip(y).enumerate() {
            if !(data.var > 0.0) {
                return Err(MealError::InvalidParam(format!(
                    "LevenbergMarquardt::calculate_chisq datum {} has variance {}",
                    datum, data.var
                )));
            }

            abscissa.apply();
            let value = model.evaluate(Some(&mut self.gradient))?;
            if self.gradient.len() != nparam {
                return Err(MealError::InvalidState(format!(
                    "{} returned {} gradient elements for nparam={}",
                    model.name(),
                    self.gradient.len(),
                    nparam
                )));
            }

            let weight = 1.0 / data.var;
            let residual = data.val.clone() + (-value);

            for i in 0..nparam {
                if !infit[i] {
                    continue;
                }
                self.beta[i] += weight * residual.inner(&self.gradient[i]);
                for j in 0..=i {
                    if infit[j] {
                        self.alpha[[i, j]] += weight * self.gradient[i].inner(&self.gradient[j]);
                    }
                }
            }

            let contribution = weight * residual.norm_sqr();
            chisq += contribution;

            if self.config.verbose >= 3 {
                trace!(datum, contribution, "LevenbergMarquardt::calculate_chisq");
            }
        }

        for i in 1..nparam {
            for j in 0..i {
                self.alpha[[j, i]] = self.alpha[[i, j]];
            }
        }

        Ok(chisq)
    }
}

impl<G: Element> Default for LevenbergMarquardt<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use crate::error::ErrorKind;
    use crate::model::{share, Function};
    use crate::models::{Polynomial, ScalarParameter};
    use crate::rules::Sum;
    use approx::assert_relative_eq;

    fn line_data(axis: &Axis<f64>) -> (Vec<crate::axis::AxisValue<f64>>, Vec<Estimate<f64>>) {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = xs.iter().map(|x| Estimate::new(1.0 + 2.0 * x, 1.0)).collect();
        (axis.values(xs), y)
    }

    #[test]
    fn test_linear_model_converges_in_one_step() {
        let axis = Axis::new(0.0);
        let line = Polynomial::new(2, &axis).unwrap();
        let (x, y) = line_data(&axis);

        let mut lm = LevenbergMarquardt::new().with_lamda(0.0);
        let initial = lm.init(&x, &y, &line).unwrap();
        assert!(initial > 0.0);

        let chisq = lm.iter(&x, &y, &line).unwrap();
        assert_relative_eq!(chisq, 0.0, epsilon = 1e-18);
        assert_relative_eq!(line.param(0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(line.param(1).unwrap(), 2.0, epsilon = 1e-12);

        let result = lm.result(&line).unwrap();
        assert_eq!(result.nfree, 2);
        // covariance of the slope for unit errors is 1 / Σ(x - x̄)²
        assert_relative_eq!(result.covariance[[1, 1]], 1.0 / 82.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rejected_step_restores_parameters() {
        let axis = Axis::new(0.0);
        let line = Polynomial::with_coefficients(&[1.0, 2.0], &axis).unwrap();
        let (x, y) = line_data(&axis);

        let mut lm = LevenbergMarquardt::new();
        assert_eq!(lm.init(&x, &y, &line).unwrap(), 0.0);

        // already at the minimum: the step is zero and cannot improve
        let lamda = lm.lamda();
        let chisq = lm.iter(&x, &y, &line).unwrap();
        assert_eq!(chisq, 0.0);
        assert_eq!(lm.lamda(), lamda * 10.0);
        assert_eq!(line.coefficients(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_fixed_parameters_are_not_varied() {
        let axis = Axis::new(0.0);
        let line = Polynomial::new(2, &axis).unwrap();
        line.set_infit(0, false).unwrap();
        let (x, y) = line_data(&axis);

        let mut lm = LevenbergMarquardt::new();
        lm.init(&x, &y, &line).unwrap();
        for _ in 0..5 {
            lm.iter(&x, &y, &line).unwrap();
        }

        assert_eq!(line.param(0).unwrap(), 0.0);
        let result = lm.result(&line).unwrap();
        assert_eq!(result.nfree, 1);
        assert_eq!(result.covariance[[0, 0]], 0.0);
        assert_eq!(result.covariance[[0, 1]], 0.0);
        assert!(result.covariance[[1, 1]] > 0.0);
    }

    #[test]
    fn test_data_checks() {
        let axis = Axis::new(0.0);
        let line = Polynomial::new(2, &axis).unwrap();
        let (x, mut y) = line_data(&axis);

        let mut lm = LevenbergMarquardt::new();
        let err = lm.init(&x[..3], &y, &line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);

        y[4].var = 0.0;
        let err = lm.init(&x, &y, &line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
    }

    #[test]
    fn test_state_checks() {
        let axis = Axis::new(0.0);
        let line = Polynomial::new(2, &axis).unwrap();
        let (x, y) = line_data(&axis);

        let mut lm = LevenbergMarquardt::new();
        let err = lm.iter(&x, &y, &line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        lm.init(&x, &y, &line).unwrap();
        let cubic = Polynomial::new(4, &axis).unwrap();
        let err = lm.iter(&x, &y, &cubic).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        line.set_infit(0, false).unwrap();
        line.set_infit(1, false).unwrap();
        let err = lm.iter(&x, &y, &line).unwrap_err();
        assert!(matches!(err, MealError::NoFreeParameters));
        assert!(!err.is_numerical());
    }

    #[test]
    fn test_failed_init_leaves_solver_uninitialised() {
        let axis = Axis::new(0.0);
        let line = Polynomial::new(2, &axis).unwrap();
        let (x, y) = line_data(&axis);

        let mut lm = LevenbergMarquardt::new();
        lm.init(&x, &y, &line).unwrap();

        // a second model of the same size, with mismatched data
        let other = Polynomial::new(2, &axis).unwrap();
        let err = lm.init(&x[..1], &y, &other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);

        let err = lm.iter(&x, &y, &other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(lm.result(&other).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(other.param(1).unwrap(), 0.0);

        // a successful init recovers
        lm.init(&x, &y, &other).unwrap();
        assert!(lm.iter(&x, &y, &other).is_ok());
    }

    #[test]
    fn test_degenerate_parameters_reported() {
        let mut sum = Sum::new();
        sum.add_model(share(ScalarParameter::new("a", 1.0)));
        sum.add_model(share(ScalarParameter::new("b", 1.0)));

        let x = vec![(); 5];
        let y = vec![Estimate::new(4.0, 1.0); 5];

        let mut lm = LevenbergMarquardt::new();
        lm.init(&x, &y, &sum).unwrap();

        let err = lm.result(&sum).unwrap_err();
        assert!(err.is_numerical());
        match err {
            MealError::SingularMatrix { degenerate, .. } => {
                assert_eq!(degenerate, vec!["a and b".to_string()]);
            }
            other => panic!("Expected SingularMatrix, got {:?}", other),
        }
    }
}
