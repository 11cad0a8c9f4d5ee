use ethers::prelude::*;
use std::sync::Arc;

pub fn create_provider(rpc_url: &str) -> anyhow::Result<Arc<Provider<Http>>> {
    let provider = Provider::<Http>::try_from(rpc_url)?;
    Ok(Arc::new(provider))
}
