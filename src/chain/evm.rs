// src/chain/evm.rs
//
// Read-only probe of the EVM side of the chain: what does the reference transfer
// cost right now? Price = gas_price * reference gas, in raw balance units.

use std::sync::Arc;

use ethers::prelude::*;
use num_bigint::{BigInt, Sign};

#[derive(Debug, Clone)]
pub struct ReferenceFee {
    pub block_number: u64,
    pub gas_price: BigInt,
    pub gas_limit: u64,
    pub total: BigInt,
}

pub struct EvmFeeProbe {
    provider: Arc<Provider<Http>>,
    reference_gas: u64,
}

#[inline]
pub fn u256_to_bigint(v: U256) -> BigInt {
    let mut buf = [0u8; 32];
    v.to_big_endian(&mut buf);
    BigInt::from_bytes_be(Sign::Plus, &buf)
}

impl EvmFeeProbe {
    pub fn new(provider: Arc<Provider<Http>>, reference_gas: u64) -> Self {
        EvmFeeProbe { provider, reference_gas }
    }

    pub fn reference_gas(&self) -> u64 {
        self.reference_gas
    }

    pub async fn reference_fee(&self) -> anyhow::Result<ReferenceFee> {
        // Both reads in parallel; the block number pins which state the price came from.
        let (gas_price, block_number) = futures::try_join!(
            self.provider.get_gas_price(),
            self.provider.get_block_number()
        )?;

        let gas_price = u256_to_bigint(gas_price);
        let total = &gas_price * BigInt::from(self.reference_gas);
        log::debug!(
            "reference fee at block {}: {} gas x {} = {}",
            block_number, self.reference_gas, gas_price, total
        );

        Ok(ReferenceFee {
            block_number: block_number.as_u64(),
            gas_price,
            gas_limit: self.reference_gas,
            total,
        })
    }
}
