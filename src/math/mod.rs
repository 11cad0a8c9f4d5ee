pub mod error;
pub mod fraction;
pub mod regression;
pub mod rpn;

pub use error::MathError;
pub use fraction::Fraction;
pub use regression::{linear_regression, LinearFit};
