//! Routing: gas estimate + next nonce, fetched fresh per pass.
//!
//! Everything a route returns is advisory input to simulation and final
//! transaction construction — authoritative only once a simulation of
//! the built transaction succeeds.

use std::sync::Arc;
use tracing::debug;

use crate::error::WalletError;
use crate::provider::{GasQuery, Router};

#[derive(Debug, Clone, Copy)]
pub struct RoutePlan {
    pub gas_estimate: u64,
    pub nonce: u64,
}

pub struct TxRouter {
    router: Arc<dyn Router>,
}

impl TxRouter {
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self { router }
    }

    /// Build a route plan. The nonce is fetched on every call — with more
    /// than one transaction in flight for an account, a cached nonce is
    /// already stale.
    pub async fn plan(&self, query: &GasQuery) -> Result<RoutePlan, WalletError> {
        let gas_estimate = self.router.estimate_gas(query).await?;
        let nonce = self.router.transaction_count(&query.from).await?;
        debug!(gas_estimate, nonce, "route planned");
        Ok(RoutePlan {
            gas_estimate,
            nonce,
        })
    }
}
