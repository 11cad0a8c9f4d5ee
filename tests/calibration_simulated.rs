// tests/calibration_simulated.rs
// ==============================
// End-to-end calibration runs against in-memory chains.

use fee_calibrator::chain::simulated::{LinearFeeModel, SimulatedChain};
use fee_calibrator::engine::calibrator::{
    CalibrationError, CalibrationPlan, Calibrator, FeeChain, FeeParameter,
};
use fee_calibrator::math::Fraction;
use num_bigint::BigInt;
use num_traits::Signed;

fn pow10(e: u32) -> BigInt {
    BigInt::from(10u8).pow(e)
}

#[tokio::test]
async fn run_all_calibrates_both_parameters_twice() {
    let mut chain = SimulatedChain::default();
    let calibrator = Calibrator::new(CalibrationPlan::default());

    let reports = calibrator.run_all(&mut chain).await.expect("calibration succeeds");
    assert_eq!(reports.len(), 4);
    assert_eq!(reports[0].param, FeeParameter::WeightToFeeCoefficient);
    assert_eq!(reports[1].param, FeeParameter::MinGasPrice);

    for report in &reports {
        let target = report.target_price.to_bigint();
        let step = &chain.model(report.param).weight;
        let shortfall = &target - &report.calibrated_price;
        println!(
            "{}: original {} -> calibrated {} (target {}, coefficient {})",
            report.param, report.original_price, report.calibrated_price, target, report.applied_coefficient
        );
        assert!(!shortfall.is_negative(), "{} overshoots by {}", report.param, -&shortfall);
        assert!(&shortfall < step, "{} misses by {}", report.param, shortfall);
        assert_eq!(chain.coefficient(report.param), report.applied_coefficient);
    }

    // ten sweep writes plus the final apply, per parameter per pass
    assert_eq!(chain.writes(), 4 * 11);
}

#[tokio::test]
async fn second_pass_is_stable() {
    let mut chain = SimulatedChain::default();
    let reports = Calibrator::new(CalibrationPlan::default()).run_all(&mut chain).await.unwrap();
    assert_eq!(reports[0].applied_coefficient, reports[2].applied_coefficient);
    assert_eq!(reports[1].applied_coefficient, reports[3].applied_coefficient);
}

#[tokio::test]
async fn truncating_fee_model_still_lands_near_target() {
    // fee = 1e15 + 7e16 * c / 1e9, truncated
    let weight_model = LinearFeeModel {
        base: pow10(15),
        weight: BigInt::from(7) * pow10(16),
        divisor: pow10(9),
        default_coefficient: pow10(9),
    };
    let gas_model = SimulatedChain::default().model(FeeParameter::MinGasPrice).clone();
    let mut chain = SimulatedChain::new(pow10(18), weight_model, gas_model);

    let report = Calibrator::new(CalibrationPlan::default())
        .run(&mut chain, FeeParameter::WeightToFeeCoefficient)
        .await
        .unwrap();

    let target = report.target_price.to_bigint();
    let miss = (&target - &report.calibrated_price).abs();
    // within a millionth of a token
    assert!(miss < pow10(12), "missed target by {}", miss);
}

#[tokio::test]
async fn custom_target_and_sweep_are_honoured() {
    let plan = CalibrationPlan {
        sample_range: -2..3,
        step_divisor: BigInt::from(100),
        passes: 1,
        weight_target: Fraction::new(1, 20).unwrap(),
        gas_target: Fraction::new(1, 4).unwrap(),
    };
    let mut chain = SimulatedChain::default();
    let report = Calibrator::new(plan).run(&mut chain, FeeParameter::MinGasPrice).await.unwrap();

    assert_eq!(report.samples.len(), 5);
    assert_eq!(report.target_price, Fraction::from(BigInt::from(25) * pow10(16)));
    let coefficients: Vec<BigInt> = report.samples.iter().map(|s| s.coefficient.clone()).collect();
    let default = pow10(12);
    let step = &default / BigInt::from(100);
    assert_eq!(coefficients[0], &default - &step * BigInt::from(2));
    assert_eq!(coefficients[4], &default + &step * BigInt::from(2));
}

/// A chain that ignores the override: every sample sees the same price.
struct StuckChain;

impl FeeChain for StuckChain {
    async fn token_nominal(&self) -> anyhow::Result<BigInt> {
        Ok(pow10(18))
    }

    async fn default_coefficient(&self, _param: FeeParameter) -> anyhow::Result<BigInt> {
        Ok(BigInt::from(1_000_000))
    }

    async fn set_coefficient(&mut self, _param: FeeParameter, value: &BigInt) -> anyhow::Result<BigInt> {
        Ok(value.clone())
    }

    async fn measure_reference_fee(&mut self, _param: FeeParameter) -> anyhow::Result<BigInt> {
        Ok(pow10(16))
    }
}

#[tokio::test]
async fn constant_price_sweep_is_a_division_by_zero() {
    let err = Calibrator::new(CalibrationPlan::default())
        .run(&mut StuckChain, FeeParameter::WeightToFeeCoefficient)
        .await
        .unwrap_err();
    assert!(matches!(err, CalibrationError::Math(fee_calibrator::math::MathError::DivisionByZero)));
}

/// A chain whose privileged calls are refused.
struct NoSudoChain;

impl FeeChain for NoSudoChain {
    async fn token_nominal(&self) -> anyhow::Result<BigInt> {
        Ok(pow10(18))
    }

    async fn default_coefficient(&self, _param: FeeParameter) -> anyhow::Result<BigInt> {
        Ok(BigInt::from(1_000_000))
    }

    async fn set_coefficient(&mut self, _param: FeeParameter, _value: &BigInt) -> anyhow::Result<BigInt> {
        anyhow::bail!("BadOrigin")
    }

    async fn measure_reference_fee(&mut self, _param: FeeParameter) -> anyhow::Result<BigInt> {
        Ok(pow10(16))
    }
}

#[tokio::test]
async fn chain_errors_propagate() {
    let err = Calibrator::new(CalibrationPlan::default())
        .run(&mut NoSudoChain, FeeParameter::MinGasPrice)
        .await
        .unwrap_err();
    assert!(matches!(err, CalibrationError::Chain(_)));
    assert!(err.to_string().contains("BadOrigin"));
}
