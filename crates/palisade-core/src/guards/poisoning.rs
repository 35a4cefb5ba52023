//! Address-poisoning detection.
//!
//! The attack: dust a wallet from an address engineered to share the
//! visible head and tail of a frequent counterparty, then wait for the
//! user to copy it from history. Wallet UIs abbreviate addresses to
//! `0xABCD…1234`, so head + tail is exactly what the victim compares.
//!
//! Heuristic, not a guarantee: an exact history match is safe, a
//! head+tail collision with a differing middle is flagged, anything else
//! passes as unknown-but-not-spoofed. Comparison is case-insensitive —
//! EIP-55 casing must never mask a spoof.

use crate::config::PoisoningConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoisonVerdict {
    Safe,
    PotentialPoison { reason: String },
}

pub struct AddressPoisoningDetector {
    prefix_len: usize,
    suffix_len: usize,
}

impl AddressPoisoningDetector {
    pub fn new(config: &PoisoningConfig) -> Self {
        Self {
            prefix_len: config.prefix_len,
            suffix_len: config.suffix_len,
        }
    }

    /// Compare `target` against known-good history entries.
    pub fn analyze(&self, target: &str, safe_history: &[String]) -> PoisonVerdict {
        let target_norm = normalize(target);

        if safe_history
            .iter()
            .any(|entry| normalize(entry) == target_norm)
        {
            return PoisonVerdict::Safe;
        }

        for entry in safe_history {
            let entry_norm = normalize(entry);
            if entry_norm.len() < self.prefix_len + self.suffix_len
                || target_norm.len() < self.prefix_len + self.suffix_len
            {
                continue;
            }
            let prefix_match = entry_norm[..self.prefix_len] == target_norm[..self.prefix_len];
            let suffix_match = entry_norm[entry_norm.len() - self.suffix_len..]
                == target_norm[target_norm.len() - self.suffix_len..];
            if prefix_match && suffix_match {
                return PoisonVerdict::PotentialPoison {
                    reason: format!(
                        "This address looks visually identical to {} from your history \
                         (same first {} and last {} characters) but is a different address",
                        abbreviate(entry),
                        self.prefix_len,
                        self.suffix_len
                    ),
                };
            }
        }

        PoisonVerdict::Safe
    }
}

/// Strip the chain marker and fold case.
fn normalize(address: &str) -> String {
    address
        .strip_prefix("0x")
        .unwrap_or(address)
        .to_ascii_lowercase()
}

fn abbreviate(address: &str) -> String {
    if address.len() <= 12 {
        return address.to_string();
    }
    format!("{}…{}", &address[..8], &address[address.len() - 4..])
}
