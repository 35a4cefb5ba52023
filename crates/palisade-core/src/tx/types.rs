//! Transaction data model.
//!
//! Monetary values are `U256` throughout: on-chain amounts routinely
//! exceed 64-bit range, and the cost check in the simulator depends on
//! wide, checked arithmetic.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An EIP-1559 transfer, immutable once constructed. Retries build a new
/// value — nothing here is mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub value: U256,
    pub data: Vec<u8>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub chain_id: u64,
}

impl Transaction {
    /// The same transfer with a fresh nonce — used for retry after a
    /// signing failure once the previous nonce may be stale.
    pub fn with_nonce(&self, nonce: u64) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }
}

/// Outcome of one simulation pass. Produced fresh per call and never
/// cached across nonce changes.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub success: bool,
    pub estimated_gas_used: u64,
    /// Net balance movement per address, in wei. Saturates at the i128
    /// boundary for display purposes only; the funds check itself runs
    /// in U256.
    pub balance_changes: HashMap<String, i128>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    pub level: RiskLevel,
    pub description: String,
}

/// Signed payload ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// Type-2 envelope bytes (`0x02 || rlp(...)`).
    pub raw: Vec<u8>,
    /// 65-byte `r || s || y_parity` signature.
    pub signature: Vec<u8>,
    /// Keccak-256 of `raw`, `0x`-prefixed hex.
    pub tx_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_nonce_leaves_original_untouched() {
        let tx = Transaction {
            from: "0xaaaa".into(),
            to: "0xbbbb".into(),
            value: U256::from(1u64),
            data: vec![],
            nonce: 4,
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(30u64),
            max_priority_fee_per_gas: U256::from(2u64),
            chain_id: 1,
        };
        let retry = tx.with_nonce(5);
        assert_eq!(tx.nonce, 4);
        assert_eq!(retry.nonce, 5);
        assert_eq!(retry.value, tx.value);
    }

    #[test]
    fn risk_levels_order() {
        assert!(RiskLevel::Low < RiskLevel::Critical);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }
}
