// In-memory chain whose fees follow a linear model of the configured coefficient.
// Used by the simulation endpoint and by tests; integer truncation mimics how the
// runtime converts weight into balance.

use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::engine::calibrator::{FeeChain, FeeParameter};

/// `fee = base + weight * coefficient / divisor`
#[derive(Clone, Debug)]
pub struct LinearFeeModel {
    pub base: BigInt,
    pub weight: BigInt,
    pub divisor: BigInt,
    pub default_coefficient: BigInt,
}

impl LinearFeeModel {
    pub fn fee(&self, coefficient: &BigInt) -> BigInt {
        &self.base + &self.weight * coefficient / &self.divisor
    }
}

#[derive(Clone, Debug)]
pub struct SimulatedChain {
    nominal: BigInt,
    weight_model: LinearFeeModel,
    gas_model: LinearFeeModel,
    overrides: HashMap<FeeParameter, BigInt>,
    writes: usize,
}

impl SimulatedChain {
    pub fn new(nominal: BigInt, weight_model: LinearFeeModel, gas_model: LinearFeeModel) -> Self {
        SimulatedChain {
            nominal,
            weight_model,
            gas_model,
            overrides: HashMap::new(),
            writes: 0,
        }
    }

    pub fn nominal(&self) -> &BigInt {
        &self.nominal
    }

    pub fn model(&self, param: FeeParameter) -> &LinearFeeModel {
        match param {
            FeeParameter::WeightToFeeCoefficient => &self.weight_model,
            FeeParameter::MinGasPrice => &self.gas_model,
        }
    }

    pub fn coefficient(&self, param: FeeParameter) -> BigInt {
        self.overrides
            .get(&param)
            .cloned()
            .unwrap_or_else(|| self.model(param).default_coefficient.clone())
    }

    /// Number of privileged writes performed so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Default for SimulatedChain {
    /// 18-decimal token. An NFT transfer costs ~0.071 tokens and an EVM transfer
    /// (21000 gas) ~0.021 tokens at the default coefficients.
    fn default() -> Self {
        let nominal = BigInt::from(10u8).pow(18);
        let weight_model = LinearFeeModel {
            base: BigInt::from(10u8).pow(15),
            weight: BigInt::from(70_000_000u64),
            divisor: BigInt::from(1u8),
            default_coefficient: BigInt::from(1_000_000_000u64),
        };
        let gas_model = LinearFeeModel {
            base: BigInt::zero(),
            weight: BigInt::from(21_000u64),
            divisor: BigInt::from(1u8),
            default_coefficient: BigInt::from(1_000_000_000_000u64),
        };
        SimulatedChain::new(nominal, weight_model, gas_model)
    }
}

impl FeeChain for SimulatedChain {
    async fn token_nominal(&self) -> anyhow::Result<BigInt> {
        Ok(self.nominal.clone())
    }

    async fn default_coefficient(&self, param: FeeParameter) -> anyhow::Result<BigInt> {
        Ok(self.model(param).default_coefficient.clone())
    }

    async fn set_coefficient(&mut self, param: FeeParameter, value: &BigInt) -> anyhow::Result<BigInt> {
        if !value.is_positive() {
            anyhow::bail!("{} override must be positive, got {}", param, value);
        }
        self.writes += 1;
        self.overrides.insert(param, value.clone());
        Ok(self.coefficient(param))
    }

    async fn measure_reference_fee(&mut self, param: FeeParameter) -> anyhow::Result<BigInt> {
        Ok(self.model(param).fee(&self.coefficient(param)))
    }
}
