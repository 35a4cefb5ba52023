//! Pre-flight simulation: can the sender actually afford this transfer?
//!
//! The cost check is the most consequential line in the pipeline:
//! `value + gas_limit × max_fee_per_gas` runs entirely in checked U256.
//! A 64-bit intermediate would wrap for everyday amounts (20 ETH in wei
//! already exceeds `u64::MAX`) and approve unpayable transactions.

use alloy_primitives::U256;
use std::collections::HashMap;

use crate::tx::types::{SimulationResult, Transaction};

/// Base cost of a transfer plus calldata pricing (16 gas per non-zero
/// byte, 4 per zero byte).
fn intrinsic_gas(tx: &Transaction) -> u64 {
    let data_gas: u64 = tx
        .data
        .iter()
        .map(|b| if *b == 0 { 4 } else { 16 })
        .sum();
    21_000 + data_gas
}

/// Simulate `tx` against the sender's current balance (supplied by the
/// chain-data provider). Produces a fresh result per call.
pub fn simulate(tx: &Transaction, balance: U256) -> SimulationResult {
    let worst_case_fee = match U256::from(tx.gas_limit).checked_mul(tx.max_fee_per_gas) {
        Some(fee) => fee,
        None => return failure(tx, "Transaction cost overflows"),
    };
    let total_cost = match tx.value.checked_add(worst_case_fee) {
        Some(total) => total,
        None => return failure(tx, "Transaction cost overflows"),
    };

    if total_cost > balance {
        return failure(tx, "Insufficient funds");
    }

    let mut balance_changes = HashMap::new();
    balance_changes.insert(tx.from.clone(), -signed_amount(tx.value));
    balance_changes.insert(tx.to.clone(), signed_amount(tx.value));

    SimulationResult {
        success: true,
        estimated_gas_used: intrinsic_gas(tx),
        balance_changes,
        error: None,
    }
}

fn failure(tx: &Transaction, reason: &str) -> SimulationResult {
    SimulationResult {
        success: false,
        estimated_gas_used: intrinsic_gas(tx),
        balance_changes: HashMap::new(),
        error: Some(reason.to_string()),
    }
}

/// Display-only conversion; saturates past the i128 boundary.
fn signed_amount(value: U256) -> i128 {
    match u128::try_from(value) {
        Ok(v) if v <= i128::MAX as u128 => v as i128,
        _ => i128::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(value: U256, gas_limit: u64, max_fee: U256) -> Transaction {
        Transaction {
            from: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
            to: "0x9858EfFD232B4033E47d90003D41EC34EcaEda94".into(),
            value,
            data: vec![],
            nonce: 0,
            gas_limit,
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            chain_id: 1,
        }
    }

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn affordable_transfer_succeeds() {
        let tx = transfer(eth(1), 21_000, U256::from(100_000_000_000u64));
        let result = simulate(&tx, eth(2));
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.estimated_gas_used, 21_000);
        assert_eq!(result.balance_changes[&tx.from], -(eth(1).to::<i128>()));
        assert_eq!(result.balance_changes[&tx.to], eth(1).to::<i128>());
    }

    #[test]
    fn insufficient_funds_fails() {
        let tx = transfer(eth(2), 21_000, U256::from(100_000_000_000u64));
        let result = simulate(&tx, eth(1));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Insufficient funds"));
    }

    #[test]
    fn values_beyond_u64_do_not_wrap() {
        // 20 ETH in wei exceeds u64::MAX; a narrow intermediate would
        // wrap and wave this through.
        let value = eth(20);
        assert!(value > U256::from(u64::MAX));
        let tx = transfer(value, 21_000, U256::from(100_000_000_000u64));
        let result = simulate(&tx, eth(20));
        assert!(!result.success, "fee pushes cost above a 20 ETH balance");
        assert_eq!(result.error.as_deref(), Some("Insufficient funds"));
    }

    #[test]
    fn fee_product_overflow_is_a_clean_failure() {
        let tx = transfer(U256::from(1u64), u64::MAX, U256::MAX);
        let result = simulate(&tx, U256::MAX);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Transaction cost overflows"));
    }

    #[test]
    fn exact_balance_is_sufficient() {
        let fee = U256::from(21_000u64) * U256::from(100_000_000_000u64);
        let tx = transfer(eth(1), 21_000, U256::from(100_000_000_000u64));
        let result = simulate(&tx, eth(1) + fee);
        assert!(result.success);
    }

    #[test]
    fn calldata_raises_the_gas_estimate() {
        let mut tx = transfer(U256::ZERO, 50_000, U256::from(1u64));
        tx.data = vec![0x00, 0x01, 0x02];
        let result = simulate(&tx, eth(1));
        assert_eq!(result.estimated_gas_used, 21_000 + 4 + 16 + 16);
    }
}
