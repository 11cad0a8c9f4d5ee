// Least-squares line fit in exact arithmetic
//
//   a = (n·Σxy − Σx·Σy) / (n·Σx² − (Σx)²)
//   b = (Σy − a·Σx) / n
//
// Samples that all share one x (n = 1 included) make the denominator zero; that
// surfaces as MathError::DivisionByZero from the fraction layer.

use num_traits::Zero;

use super::error::MathError;
use super::fraction::Fraction;
use crate::rpn;

#[cfg(feature = "serde")]
use serde::Serialize;

/// `y = slope·x + intercept`
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: Fraction,
    pub intercept: Fraction,
}

impl LinearFit {
    pub fn predict(&self, x: &Fraction) -> Fraction {
        &(&self.slope * x) + &self.intercept
    }

    /// The x at which the line reaches `y`. Fails for a flat line.
    pub fn solve_for(&self, y: &Fraction) -> Result<Fraction, MathError> {
        (y - &self.intercept).checked_div(&self.slope)
    }
}

pub fn linear_regression(points: &[(Fraction, Fraction)]) -> Result<LinearFit, MathError> {
    if points.is_empty() {
        return Err(MathError::EmptySamples);
    }

    let mut sum_xy = Fraction::zero();
    let mut sum_x = Fraction::zero();
    let mut sum_y = Fraction::zero();
    let mut sum_x2 = Fraction::zero();
    for (x, y) in points {
        sum_xy = rpn![x, y, "*", &sum_xy, "+"]?;
        sum_x = rpn![x, &sum_x, "+"]?;
        sum_y = rpn![y, &sum_y, "+"]?;
        sum_x2 = rpn![x, "dup", "*", &sum_x2, "+"]?;
    }

    let n = Fraction::from(points.len() as u64);
    let slope = rpn![
        &n, &sum_xy, "*", &sum_x, &sum_y, "*", "-",
        &n, &sum_x2, "*", &sum_x, "dup", "*", "-",
        "/"
    ]?;
    let intercept = rpn![&sum_y, &slope, &sum_x, "*", "-", &n, "/"]?;

    Ok(LinearFit { slope, intercept })
}
