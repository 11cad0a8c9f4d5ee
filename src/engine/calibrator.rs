// Fee coefficient calibration
// ===========================
// Tunes one chain fee coefficient so that a reference operation costs a target price:
//   1) measure the current price of the reference operation
//   2) sweep the coefficient around its default (default + default/step_divisor * i)
//   3) record (observed price, coefficient read back) for every step
//   4) fit coefficient = a·price + b in exact arithmetic
//   5) evaluate the fit at the target price, truncate to an integer
//   6) apply it and measure again
//
// Chain access goes through the FeeChain trait; this module never talks RPC itself.

use std::fmt;
use std::ops::Range;

use num_bigint::BigInt;
use num_traits::Signed;
use thiserror::Error;

use crate::math::{linear_regression, Fraction, LinearFit, MathError};

/// The two fee knobs exposed by the chain's configuration pallet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeeParameter {
    /// Substrate weight-to-fee multiplier; reference operation is an NFT transfer.
    WeightToFeeCoefficient,
    /// EVM minimum gas price; reference operation is an EVM transfer.
    MinGasPrice,
}

impl FeeParameter {
    pub const ALL: [FeeParameter; 2] = [FeeParameter::WeightToFeeCoefficient, FeeParameter::MinGasPrice];

    pub fn as_str(self) -> &'static str {
        match self {
            FeeParameter::WeightToFeeCoefficient => "weight_to_fee_coefficient",
            FeeParameter::MinGasPrice => "min_gas_price",
        }
    }
}

impl fmt::Display for FeeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain-side operations the calibrator needs. Amounts are raw balance units.
#[allow(async_fn_in_trait)]
pub trait FeeChain {
    /// Raw units in one whole token.
    async fn token_nominal(&self) -> anyhow::Result<BigInt>;

    /// Coefficient the runtime ships with, used as the sweep centre.
    async fn default_coefficient(&self, param: FeeParameter) -> anyhow::Result<BigInt>;

    /// Privileged write of an override. Returns the value read back from storage.
    async fn set_coefficient(&mut self, param: FeeParameter, value: &BigInt) -> anyhow::Result<BigInt>;

    /// Balance spent by the sender on one reference operation.
    async fn measure_reference_fee(&mut self, param: FeeParameter) -> anyhow::Result<BigInt>;
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error(transparent)]
    Math(#[from] MathError),

    #[error("chain call failed: {0}")]
    Chain(#[from] anyhow::Error),

    #[error("solved {param} coefficient {value} is not positive")]
    NonPositiveCoefficient { param: FeeParameter, value: BigInt },
}

#[derive(Clone, Debug)]
pub struct CalibrationPlan {
    /// Step indices of the sweep; `-5..5` samples ten coefficients.
    pub sample_range: Range<i64>,
    pub step_divisor: BigInt,
    /// Full sweeps over every parameter in `run_all`.
    pub passes: u32,
    /// Target price of the NFT transfer, as a fraction of one token.
    pub weight_target: Fraction,
    /// Target price of the EVM transfer, as a fraction of one token.
    pub gas_target: Fraction,
}

impl Default for CalibrationPlan {
    fn default() -> Self {
        CalibrationPlan {
            sample_range: -5..5,
            step_divisor: BigInt::from(1000),
            passes: 2,
            weight_target: Fraction::new(1, 10).unwrap_or_default(),
            gas_target: Fraction::new(15, 100).unwrap_or_default(),
        }
    }
}

impl CalibrationPlan {
    pub fn target_fraction(&self, param: FeeParameter) -> &Fraction {
        match param {
            FeeParameter::WeightToFeeCoefficient => &self.weight_target,
            FeeParameter::MinGasPrice => &self.gas_target,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CalibrationSample {
    pub price: BigInt,
    pub coefficient: BigInt,
}

#[derive(Clone, Debug)]
pub struct CalibrationReport {
    pub param: FeeParameter,
    pub original_price: BigInt,
    pub target_price: Fraction,
    pub samples: Vec<CalibrationSample>,
    pub fit: LinearFit,
    pub applied_coefficient: BigInt,
    pub calibrated_price: BigInt,
}

/// Fit `coefficient = a·price + b` and evaluate it at `target_price`.
pub fn solve_coefficient(
    samples: &[CalibrationSample],
    target_price: &Fraction,
) -> Result<(LinearFit, BigInt), MathError> {
    let points: Vec<(Fraction, Fraction)> = samples
        .iter()
        .map(|s| (Fraction::from(s.price.clone()), Fraction::from(s.coefficient.clone())))
        .collect();
    let fit = linear_regression(&points)?;
    let coefficient = fit.predict(target_price).to_bigint();
    Ok((fit, coefficient))
}

pub struct Calibrator {
    plan: CalibrationPlan,
}

impl Calibrator {
    pub fn new(plan: CalibrationPlan) -> Self {
        Calibrator { plan }
    }

    pub fn plan(&self) -> &CalibrationPlan {
        &self.plan
    }

    pub async fn run<C: FeeChain>(
        &self,
        chain: &mut C,
        param: FeeParameter,
    ) -> Result<CalibrationReport, CalibrationError> {
        let nominal = Fraction::from(chain.token_nominal().await?);
        let target_price = &nominal * self.plan.target_fraction(param);

        let original_price = chain.measure_reference_fee(param).await?;
        log::info!(
            "{}: original price {} tokens",
            param,
            describe_tokens(&original_price, &nominal)
        );

        let default = chain.default_coefficient(param).await?;
        let step = &default / &self.plan.step_divisor;
        let mut samples = Vec::with_capacity(self.plan.sample_range.clone().count());
        for i in self.plan.sample_range.clone() {
            let requested = &default + &step * BigInt::from(i);
            let coefficient = chain.set_coefficient(param, &requested).await?;
            let price = chain.measure_reference_fee(param).await?;
            log::debug!("{}: coefficient {} -> price {}", param, coefficient, price);
            samples.push(CalibrationSample { price, coefficient });
        }

        let (fit, solved) = solve_coefficient(&samples, &target_price)?;
        if !solved.is_positive() {
            return Err(CalibrationError::NonPositiveCoefficient { param, value: solved });
        }

        let applied_coefficient = chain.set_coefficient(param, &solved).await?;
        let calibrated_price = chain.measure_reference_fee(param).await?;
        log::info!(
            "{}: coefficient {} gives price {} tokens (target {})",
            param,
            applied_coefficient,
            describe_tokens(&calibrated_price, &nominal),
            target_price.checked_div(&nominal).map(|t| t.to_f64()).unwrap_or(f64::NAN),
        );

        Ok(CalibrationReport {
            param,
            original_price,
            target_price,
            samples,
            fit,
            applied_coefficient,
            calibrated_price,
        })
    }

    /// Calibrate every parameter, `passes` times over, returning each report in order.
    pub async fn run_all<C: FeeChain>(&self, chain: &mut C) -> Result<Vec<CalibrationReport>, CalibrationError> {
        let mut reports = Vec::new();
        for pass in 0..self.plan.passes {
            log::info!("calibration pass {}/{}", pass + 1, self.plan.passes);
            for param in FeeParameter::ALL {
                reports.push(self.run(chain, param).await?);
            }
        }
        Ok(reports)
    }
}

fn describe_tokens(raw: &BigInt, nominal: &Fraction) -> f64 {
    Fraction::from(raw.clone())
        .checked_div(nominal)
        .map(|v| v.to_f64())
        .unwrap_or(f64::NAN)
}
