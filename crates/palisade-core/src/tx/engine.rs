//! Pipeline orchestration.
//!
//! Ordering rules enforced here:
//! - signing is refused unless the most recent simulation of this exact
//!   transaction (signing-hash identity, nonce included) succeeded;
//! - a failed simulation clears the gate;
//! - a failed signing leaves the gate intact — the simulate/analyze
//!   results stay valid for a retry with a fresh nonce;
//! - nonces come from `route`, which re-fetches on every call.
//!
//! Analysis annotates and never blocks.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use palisade_crypto::hskdf::log_fingerprint;
use palisade_crypto::{Chain, DerivedKeyMaterial};
use palisade_vault::keystore::Authorizer;

use crate::config::CoreConfig;
use crate::error::WalletError;
use crate::provider::{ChainDataProvider, GasQuery, Router};
use crate::tx::analyzer::RiskAnalyzer;
use crate::tx::router::{RoutePlan, TxRouter};
use crate::tx::signer;
use crate::tx::simulator;
use crate::tx::types::{RiskAlert, SignedTransaction, SimulationResult, Transaction};

/// Everything a confirmation surface needs after one full pass.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub simulation: SimulationResult,
    pub alerts: Vec<RiskAlert>,
    pub signed: SignedTransaction,
    pub tx_hash: String,
}

struct EngineState {
    /// Signing hash of the last successfully simulated transaction.
    cleared: Option<[u8; 32]>,
    /// Hashes returned by the broadcaster, in submission order.
    broadcast_log: Vec<String>,
}

pub struct TransactionEngine {
    provider: Arc<dyn ChainDataProvider>,
    router: TxRouter,
    analyzer: RiskAnalyzer,
    authorizer: Arc<dyn Authorizer>,
    prompt_timeout: Duration,
    state: Mutex<EngineState>,
}

impl TransactionEngine {
    pub fn new(
        provider: Arc<dyn ChainDataProvider>,
        router: Arc<dyn Router>,
        authorizer: Arc<dyn Authorizer>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            provider,
            router: TxRouter::new(router),
            analyzer: RiskAnalyzer::new(config),
            authorizer,
            prompt_timeout: Duration::from_secs(config.hardware.prompt_timeout_secs),
            state: Mutex::new(EngineState {
                cleared: None,
                broadcast_log: Vec::new(),
            }),
        }
    }

    /// Fetch gas estimate + next nonce for a prospective transfer.
    pub async fn route(&self, query: &GasQuery) -> Result<RoutePlan, WalletError> {
        self.router.plan(query).await
    }

    /// Simulate against the sender's current balance. A success arms the
    /// signing gate for exactly this transaction; a failure disarms it.
    pub async fn simulate(&self, tx: &Transaction) -> Result<SimulationResult, WalletError> {
        let identity = signer::signing_hash(tx)?;
        let balance = self
            .provider
            .fetch_balance(&tx.from, Chain::Ethereum)
            .await?;
        let result = simulator::simulate(tx, balance);

        let mut state = self.state.lock();
        state.cleared = result.success.then_some(identity);
        debug!(
            success = result.success,
            gas = result.estimated_gas_used,
            "simulation completed"
        );
        Ok(result)
    }

    /// Risk annotation. Provider trouble degrades to an empty history —
    /// analysis must never block the flow.
    pub async fn analyze(&self, tx: &Transaction) -> Vec<RiskAlert> {
        let history = match self
            .provider
            .fetch_history(&tx.from, Chain::Ethereum)
            .await
        {
            Ok(history) => history,
            Err(err) => {
                warn!(error = %err, "history unavailable; analyzing without it");
                Vec::new()
            }
        };
        self.analyzer.analyze(tx, &history)
    }

    /// Sign a previously simulated transaction. The platform gesture runs
    /// first; the gate survives a signing failure so the caller can retry.
    pub async fn sign(
        &self,
        tx: &Transaction,
        key: &DerivedKeyMaterial,
    ) -> Result<SignedTransaction, WalletError> {
        let identity = signer::signing_hash(tx)?;
        {
            let state = self.state.lock();
            if state.cleared != Some(identity) {
                return Err(WalletError::SimulationRequired);
            }
        }

        tokio::time::timeout(
            self.prompt_timeout,
            self.authorizer.authorize("Sign transaction"),
        )
        .await
        .map_err(|_| WalletError::Timeout)?
        .map_err(WalletError::from)?;

        let signed = signer::sign_eip1559(tx, key)?;
        info!(
            sender = %log_fingerprint(tx.from.as_bytes()),
            tx = %signed.tx_hash,
            "transaction signed"
        );
        Ok(signed)
    }

    /// Hand a signed payload to the external broadcaster and record the
    /// returned hash.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<String, WalletError> {
        let hash = self
            .provider
            .broadcast(&signed.raw, Chain::Ethereum)
            .await?;
        self.state.lock().broadcast_log.push(hash.clone());
        Ok(hash)
    }

    /// Full pass: simulate → analyze → sign → broadcast. A failed
    /// simulation stops before signing; alerts annotate but never block.
    pub async fn submit(
        &self,
        tx: &Transaction,
        key: &DerivedKeyMaterial,
    ) -> Result<SubmitOutcome, WalletError> {
        let simulation = self.simulate(tx).await?;
        if !simulation.success {
            return Err(WalletError::InsufficientFunds);
        }
        let alerts = self.analyze(tx).await;
        let signed = self.sign(tx, key).await?;
        let tx_hash = self.broadcast(&signed).await?;
        Ok(SubmitOutcome {
            simulation,
            alerts,
            signed,
            tx_hash,
        })
    }

    pub fn broadcast_log(&self) -> Vec<String> {
        self.state.lock().broadcast_log.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HistoryEntry;
    use alloy_primitives::U256;
    use async_trait::async_trait;
    use palisade_crypto::hd;
    use palisade_vault::keystore::AlwaysApprove;
    use palisade_vault::VaultError;
    use sha3::{Digest, Keccak256};
    use std::sync::atomic::{AtomicU64, Ordering};

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    struct MockProvider {
        balance: U256,
        history: Vec<HistoryEntry>,
        broadcasts: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl ChainDataProvider for MockProvider {
        async fn fetch_balance(&self, _address: &str, _chain: Chain) -> Result<U256, WalletError> {
            Ok(self.balance)
        }

        async fn fetch_history(
            &self,
            _address: &str,
            _chain: Chain,
        ) -> Result<Vec<HistoryEntry>, WalletError> {
            Ok(self.history.clone())
        }

        async fn broadcast(&self, raw_tx: &[u8], _chain: Chain) -> Result<String, WalletError> {
            self.broadcasts.lock().push(raw_tx.to_vec());
            Ok(format!("0x{}", hex::encode(Keccak256::digest(raw_tx))))
        }

        async fn estimate_gas(&self, _query: &GasQuery) -> Result<u64, WalletError> {
            Ok(21_000)
        }

        async fn fetch_price(&self, _chain: Chain) -> Result<f64, WalletError> {
            Ok(3_000.0)
        }
    }

    struct MockRouter {
        nonce: AtomicU64,
    }

    #[async_trait]
    impl Router for MockRouter {
        async fn estimate_gas(&self, _query: &GasQuery) -> Result<u64, WalletError> {
            Ok(21_000)
        }

        async fn transaction_count(&self, _address: &str) -> Result<u64, WalletError> {
            Ok(self.nonce.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn engine_with_balance(balance: U256) -> (TransactionEngine, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider {
            balance,
            history: vec![],
            broadcasts: Mutex::new(vec![]),
        });
        let engine = TransactionEngine::new(
            provider.clone(),
            Arc::new(MockRouter {
                nonce: AtomicU64::new(0),
            }),
            Arc::new(AlwaysApprove),
            &CoreConfig::default(),
        );
        (engine, provider)
    }

    fn key() -> DerivedKeyMaterial {
        hd::derive_key_material(PHRASE, Chain::Ethereum, 0).unwrap()
    }

    fn transfer(from: &str, nonce: u64) -> Transaction {
        Transaction {
            from: from.into(),
            to: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
            value: eth(1),
            data: vec![],
            nonce,
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(40_000_000_000u64),
            max_priority_fee_per_gas: U256::from(2_000_000_000u64),
            chain_id: 1,
        }
    }

    #[tokio::test]
    async fn signing_without_simulation_is_refused() {
        let (engine, _) = engine_with_balance(eth(10));
        let key = key();
        let tx = transfer(&key.address, 0);
        assert!(matches!(
            engine.sign(&tx, &key).await,
            Err(WalletError::SimulationRequired)
        ));
    }

    #[tokio::test]
    async fn failed_simulation_blocks_signing() {
        let (engine, _) = engine_with_balance(U256::ZERO);
        let key = key();
        let tx = transfer(&key.address, 0);
        let result = engine.simulate(&tx).await.unwrap();
        assert!(!result.success);
        assert!(matches!(
            engine.sign(&tx, &key).await,
            Err(WalletError::SimulationRequired)
        ));
    }

    #[tokio::test]
    async fn gate_is_per_transaction_identity() {
        let (engine, _) = engine_with_balance(eth(10));
        let key = key();
        let tx = transfer(&key.address, 0);
        engine.simulate(&tx).await.unwrap();
        // Same transfer but a different nonce is a different transaction.
        assert!(matches!(
            engine.sign(&tx.with_nonce(1), &key).await,
            Err(WalletError::SimulationRequired)
        ));
        // The simulated one still signs.
        assert!(engine.sign(&tx, &key).await.is_ok());
    }

    #[tokio::test]
    async fn signing_failure_keeps_the_gate_armed() {
        let (engine, _) = engine_with_balance(eth(10));
        let key = key();
        let tx = transfer(&key.address, 0);
        engine.simulate(&tx).await.unwrap();

        // Wrong key: signing fails but the simulation stays valid.
        let other = hd::derive_key_material(PHRASE, Chain::Ethereum, 1).unwrap();
        assert!(engine.sign(&tx, &other).await.is_err());
        assert!(engine.sign(&tx, &key).await.is_ok());
    }

    #[tokio::test]
    async fn submit_runs_the_full_pipeline() {
        let (engine, provider) = engine_with_balance(eth(10));
        let key = key();
        let tx = transfer(&key.address, 0);
        let outcome = engine.submit(&tx, &key).await.unwrap();
        assert!(outcome.simulation.success);
        // Fresh destination: annotated, not blocked.
        assert!(!outcome.alerts.is_empty());
        assert_eq!(outcome.tx_hash, outcome.signed.tx_hash);
        assert_eq!(provider.broadcasts.lock().len(), 1);
        assert_eq!(engine.broadcast_log(), vec![outcome.tx_hash.clone()]);
    }

    #[tokio::test]
    async fn submit_stops_on_insufficient_funds() {
        let (engine, provider) = engine_with_balance(U256::ZERO);
        let key = key();
        let tx = transfer(&key.address, 0);
        assert!(matches!(
            engine.submit(&tx, &key).await,
            Err(WalletError::InsufficientFunds)
        ));
        assert!(provider.broadcasts.lock().is_empty());
    }

    #[tokio::test]
    async fn route_refetches_nonce_for_inflight_retries() {
        let (engine, _) = engine_with_balance(eth(10));
        let query = GasQuery {
            from: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
            to: "0x9858EfFD232B4033E47d90003D41EC34EcaEda94".into(),
            value: eth(1),
            data: vec![],
        };
        let first = engine.route(&query).await.unwrap();
        let second = engine.route(&query).await.unwrap();
        assert_ne!(first.nonce, second.nonce);
    }

    struct DenyAll;

    #[async_trait]
    impl Authorizer for DenyAll {
        async fn authorize(&self, _reason: &str) -> Result<(), VaultError> {
            Err(VaultError::AuthFailed)
        }
    }

    #[tokio::test]
    async fn denied_gesture_refuses_to_sign() {
        let provider = Arc::new(MockProvider {
            balance: eth(10),
            history: vec![],
            broadcasts: Mutex::new(vec![]),
        });
        let engine = TransactionEngine::new(
            provider,
            Arc::new(MockRouter {
                nonce: AtomicU64::new(0),
            }),
            Arc::new(DenyAll),
            &CoreConfig::default(),
        );
        let key = key();
        let tx = transfer(&key.address, 0);
        engine.simulate(&tx).await.unwrap();
        assert!(matches!(
            engine.sign(&tx, &key).await,
            Err(WalletError::VerificationFailed(_))
        ));
    }
}
