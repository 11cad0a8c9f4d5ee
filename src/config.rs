use std::env;
use std::str::FromStr;

use num_bigint::BigInt;
use url::Url;

use crate::engine::calibrator::CalibrationPlan;
use crate::math::Fraction;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// EVM JSON-RPC endpoint of the node; the reference-fee probe is disabled without it.
    pub evm_rpc_url: Option<String>,
    pub reference_transfer_gas: u64,
    pub token_decimals: u32,

    // Calibration sweep
    pub sample_from: i64,
    pub sample_to: i64,
    pub step_divisor: u64,
    pub passes: u32,
    pub weight_target: Fraction,
    pub gas_target: Fraction,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load configuration files (secrets first, then public config)
        dotenv::from_filename("secrets.env").ok();
        dotenv::from_filename("config/calibration.env").ok();
        dotenv::dotenv().ok();

        let evm_rpc_url = match env::var("EVM_RPC_URL") {
            Ok(raw) if !raw.trim().is_empty() => {
                Url::parse(raw.trim()).map_err(|e| format!("EVM_RPC_URL is not a valid URL: {}", e))?;
                Some(raw.trim().to_string())
            }
            _ => None,
        };

        let weight_target = match env::var("CALIBRATION_WEIGHT_TARGET") {
            Ok(raw) => raw.parse().map_err(|e| format!("CALIBRATION_WEIGHT_TARGET: {}", e))?,
            Err(_) => Fraction::new(1, 10)?,
        };
        let gas_target = match env::var("CALIBRATION_GAS_TARGET") {
            Ok(raw) => raw.parse().map_err(|e| format!("CALIBRATION_GAS_TARGET: {}", e))?,
            Err(_) => Fraction::new(15, 100)?,
        };

        let config = Config {
            port: parse_or("PORT", 8000),
            evm_rpc_url,
            reference_transfer_gas: parse_or("REFERENCE_TRANSFER_GAS", 21_000),
            token_decimals: parse_or("TOKEN_DECIMALS", 18),
            sample_from: parse_or("CALIBRATION_SAMPLE_FROM", -5),
            sample_to: parse_or("CALIBRATION_SAMPLE_TO", 5),
            step_divisor: parse_or("CALIBRATION_STEP_DIVISOR", 1000),
            passes: parse_or("CALIBRATION_PASSES", 2),
            weight_target,
            gas_target,
        };

        if config.sample_from >= config.sample_to {
            return Err("CALIBRATION_SAMPLE_FROM must be below CALIBRATION_SAMPLE_TO".into());
        }
        if config.step_divisor == 0 {
            return Err("CALIBRATION_STEP_DIVISOR must be non-zero".into());
        }
        Ok(config)
    }

    pub fn calibration_plan(&self) -> CalibrationPlan {
        CalibrationPlan {
            sample_range: self.sample_from..self.sample_to,
            step_divisor: BigInt::from(self.step_divisor),
            passes: self.passes,
            weight_target: self.weight_target.clone(),
            gas_target: self.gas_target.clone(),
        }
    }
}
