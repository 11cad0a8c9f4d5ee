use std::sync::Arc;

use crate::chain::{evm::EvmFeeProbe, providers};
use crate::config::Config;
use crate::engine::calibrator::CalibrationPlan;

pub struct AppState {
    pub fee_probe: Option<EvmFeeProbe>,
    pub plan: CalibrationPlan,
    pub token_decimals: u32,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let fee_probe = match &config.evm_rpc_url {
            Some(url) => {
                let provider = providers::create_provider(url)?;
                Some(EvmFeeProbe::new(provider, config.reference_transfer_gas))
            }
            None => {
                log::warn!("EVM_RPC_URL not set; reference fee probe disabled");
                None
            }
        };

        Ok(AppState {
            fee_probe,
            plan: config.calibration_plan(),
            token_decimals: config.token_decimals,
        })
    }

    /// State without any chain connection, as used by the simulation-only service and tests.
    pub fn offline(plan: CalibrationPlan, token_decimals: u32) -> Arc<Self> {
        Arc::new(AppState { fee_probe: None, plan, token_decimals })
    }
}
