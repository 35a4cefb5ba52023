//! External collaborator seams.
//!
//! The core performs no network I/O of its own: balances, history, gas
//! estimates, nonces and broadcast all arrive through these traits. Every
//! value is advisory until confirmed by simulation.

use alloy_primitives::U256;
use async_trait::async_trait;

use palisade_crypto::Chain;

use crate::error::WalletError;

/// One historical transfer involving the wallet.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub counterparty: String,
    pub value: U256,
    pub outgoing: bool,
}

/// Parameters of a gas estimation call.
#[derive(Debug, Clone)]
pub struct GasQuery {
    pub from: String,
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
}

/// Chain-data provider: pre-fetched reads plus broadcast.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    async fn fetch_balance(&self, address: &str, chain: Chain) -> Result<U256, WalletError>;

    async fn fetch_history(
        &self,
        address: &str,
        chain: Chain,
    ) -> Result<Vec<HistoryEntry>, WalletError>;

    /// Hand a signed payload to the network. Returns the transaction hash.
    async fn broadcast(&self, raw_tx: &[u8], chain: Chain) -> Result<String, WalletError>;

    async fn estimate_gas(&self, query: &GasQuery) -> Result<u64, WalletError>;

    async fn fetch_price(&self, chain: Chain) -> Result<f64, WalletError>;
}

/// Routing inputs: gas estimate and the next account nonce.
#[async_trait]
pub trait Router: Send + Sync {
    async fn estimate_gas(&self, query: &GasQuery) -> Result<u64, WalletError>;

    /// Next nonce for the account. Must be re-fetched per routing pass;
    /// a cached nonce goes stale as soon as a second transaction is in
    /// flight for the same account.
    async fn transaction_count(&self, address: &str) -> Result<u64, WalletError>;
}
