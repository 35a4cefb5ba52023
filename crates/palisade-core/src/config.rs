use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoisoningConfig {
    /// Hex characters compared after the `0x` marker.
    pub prefix_len: usize,
    /// Hex characters compared at the tail.
    pub suffix_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    pub default_clear_secs: u64,
    /// Shorter window for recovery phrases and private material.
    pub sensitive_clear_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Upper bound on any hardware prompt (tap, biometric, PIN).
    pub prompt_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Flag transfers larger than this multiple of the largest
    /// historical transfer.
    pub large_value_multiplier: u64,
    #[serde(default)]
    pub flag_unknown_destination: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub poisoning: PoisoningConfig,
    pub clipboard: ClipboardConfig,
    pub hardware: HardwareConfig,
    pub risk: RiskConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            poisoning: PoisoningConfig {
                prefix_len: 4,
                suffix_len: 4,
            },
            clipboard: ClipboardConfig {
                default_clear_secs: 60,
                sensitive_clear_secs: 30,
            },
            hardware: HardwareConfig {
                prompt_timeout_secs: 60,
            },
            risk: RiskConfig {
                large_value_multiplier: 10,
                flag_unknown_destination: true,
            },
        }
    }
}
