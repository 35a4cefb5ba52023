//! Heuristic risk scoring.
//!
//! Analysis annotates — it never blocks signing. Each check contributes
//! zero or more alerts; the caller decides what to surface for
//! confirmation. Ordered most severe first.

use alloy_primitives::U256;

use crate::config::CoreConfig;
use crate::guards::poisoning::{AddressPoisoningDetector, PoisonVerdict};
use crate::provider::HistoryEntry;
use crate::tx::types::{RiskAlert, RiskLevel, Transaction};

pub struct RiskAnalyzer {
    detector: AddressPoisoningDetector,
    large_value_multiplier: u64,
    flag_unknown_destination: bool,
}

impl RiskAnalyzer {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            detector: AddressPoisoningDetector::new(&config.poisoning),
            large_value_multiplier: config.risk.large_value_multiplier,
            flag_unknown_destination: config.risk.flag_unknown_destination,
        }
    }

    pub fn analyze(&self, tx: &Transaction, history: &[HistoryEntry]) -> Vec<RiskAlert> {
        let mut alerts = Vec::new();

        let known: Vec<String> = history.iter().map(|h| h.counterparty.clone()).collect();

        // Lookalike destinations outrank everything else.
        if let PoisonVerdict::PotentialPoison { reason } = self.detector.analyze(&tx.to, &known)
        {
            alerts.push(RiskAlert {
                level: RiskLevel::Critical,
                description: reason,
            });
        }

        let seen_before = known.iter().any(|k| k.eq_ignore_ascii_case(&tx.to));
        if self.flag_unknown_destination && !seen_before {
            alerts.push(RiskAlert {
                level: RiskLevel::Medium,
                description: "You have never transacted with this address before".into(),
            });
        }

        let largest_sent = history
            .iter()
            .filter(|h| h.outgoing)
            .map(|h| h.value)
            .max()
            .unwrap_or(U256::ZERO);
        if largest_sent > U256::ZERO {
            let threshold = largest_sent
                .checked_mul(U256::from(self.large_value_multiplier))
                .unwrap_or(U256::MAX);
            if tx.value > threshold {
                alerts.push(RiskAlert {
                    level: RiskLevel::High,
                    description: format!(
                        "This transfer is more than {}× larger than anything you have sent before",
                        self.large_value_multiplier
                    ),
                });
            }
        }

        alerts.sort_by(|a, b| b.level.cmp(&a.level));
        alerts
    }
}
