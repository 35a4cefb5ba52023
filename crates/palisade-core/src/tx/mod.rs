//! Transaction pipeline: simulate → route → analyze → sign → broadcast.

pub mod analyzer;
pub mod engine;
pub mod rlp;
pub mod router;
pub mod signer;
pub mod simulator;
pub mod types;

pub use analyzer::RiskAnalyzer;
pub use engine::TransactionEngine;
pub use router::{RoutePlan, TxRouter};
pub use signer::sign_eip1559;
pub use simulator::simulate;
pub use types::{RiskAlert, RiskLevel, SignedTransaction, SimulationResult, Transaction};
