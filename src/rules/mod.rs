//! # Composition Rules
//!
//! Models built out of other models. Every rule maps the parameters of its
//! children into its own [`Composite`](crate::composite::Composite) and
//! projects their gradients back into that space.
//!
//! - [`Sum`] and [`Product`]: the group rules over an ordered list of models
//! - [`Negation`] and [`Inverse`]: the unary cases of the group rules
//! - [`ChainRule`]: parameters of one model set by scalar functions
//! - [`VectorRule`]: one of several models, selected by index
//! - [`Cast`]: a model embedded in a richer result type
//! - [`Cached`]: memoized evaluation
//!
//! ```rust
//! use meal_rs::model::{share, Evaluable, Function};
//! use meal_rs::models::ScalarParameter;
//! use meal_rs::rules::Sum;
//!
//! let mut sum = Sum::new();
//! sum.add_model(share(ScalarParameter::new("a", 1.0)));
//! sum.add_model(share(ScalarParameter::new("b", 2.0)));
//!
//! let mut gradient = Vec::new();
//! assert_eq!(sum.evaluate(Some(&mut gradient)).unwrap(), 3.0);
//! assert_eq!(gradient, vec![1.0, 1.0]);
//! assert_eq!(sum.nparam(), 2);
//! ```

pub mod cached;
pub mod cast;
pub mod chain;
pub mod group;
pub mod unary;
pub mod vector;

pub use cached::Cached;
pub use cast::Cast;
pub use chain::ChainRule;
pub use group::{GroupOperation, GroupRule, Product, ProductOp, Sum, SumOp};
pub use unary::{difference, quotient, Inverse, Negation};
pub use vector::VectorRule;
