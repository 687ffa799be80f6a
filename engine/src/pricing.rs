use alloy_primitives::Address;
use std::collections::HashMap;

use crate::error::ReadResult;
use crate::models::ChainId;

/// Best-effort USD pricing source. A failure yields an empty map at the
/// call site and never removes a token from the eligible set.
#[allow(async_fn_in_trait)]
pub trait PriceOracle: Send + Sync {
    async fn usd_prices(
        &self,
        chain_id: ChainId,
        tokens: &[Address],
    ) -> ReadResult<HashMap<Address, f64>>;
}

/// Oracle for deployments without a quote source: prices are simply absent
/// and eligible tokens fall back to raw-amount ordering.
#[derive(Debug, Default)]
pub struct NoopOracle;

impl PriceOracle for NoopOracle {
    async fn usd_prices(
        &self,
        _chain_id: ChainId,
        _tokens: &[Address],
    ) -> ReadResult<HashMap<Address, f64>> {
        Ok(HashMap::new())
    }
}
