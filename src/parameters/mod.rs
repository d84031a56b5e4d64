//! # Parameter System
//!
//! Every model exposes its parameters through the [`ParameterPolicy`]
//! interface: a value, a variance, a fit flag and a name per index.
//!
//! - [`Parameter`]: one named value with its variance and fit flag
//! - [`Storage`]: the parameters of a leaf model (single or vector form)
//! - [`ParameterBlock`]: shared handle to a leaf model's storage
//!
//! Composite models implement the same policy by delegating each index to the
//! block that owns it (see [`crate::composite::Composite`]).
//!
//! ```rust
//! use meal_rs::parameters::{Parameter, ParameterBlock, ParameterPolicy};
//!
//! let block = ParameterBlock::new(vec![
//!     Parameter::new("amplitude", 3.0),
//!     Parameter::fixed("frequency", 2.0),
//! ]);
//!
//! assert_eq!(block.nparam(), 2);
//! assert!(!block.infit(1).unwrap());
//! block.set_param(0, 4.0).unwrap();
//! assert_eq!(block.param(0).unwrap(), 4.0);
//! ```

pub mod parameter;
pub mod storage;

pub use parameter::Parameter;
pub use storage::{ParameterBlock, Storage};

use crate::error::Result;

/// Indexed access to the parameters of a model.
///
/// Setters take `&self`: parameters live in shared blocks, so that models
/// referenced by several parents all see the same values.
pub trait ParameterPolicy {
    /// Return the number of parameters
    fn nparam(&self) -> usize;

    /// Return the name of the specified parameter
    fn param_name(&self, index: usize) -> Result<String>;

    /// Return the value of the specified parameter
    fn param(&self, index: usize) -> Result<f64>;

    /// Set the value of the specified parameter
    fn set_param(&self, index: usize, value: f64) -> Result<()>;

    /// Return the variance of the specified parameter
    fn variance(&self, index: usize) -> Result<f64>;

    /// Set the variance of the specified parameter
    fn set_variance(&self, index: usize, variance: f64) -> Result<()>;

    /// Return true if the parameter at index is to be fitted
    fn infit(&self, index: usize) -> Result<bool>;

    /// Set the flag for the parameter at index to be fitted
    fn set_infit(&self, index: usize, flag: bool) -> Result<()>;

    /// The distinct leaf blocks, in index order
    fn blocks(&self) -> Vec<ParameterBlock>;

    /// Counter that increases whenever a parameter value changes
    fn version(&self) -> u64;
}
