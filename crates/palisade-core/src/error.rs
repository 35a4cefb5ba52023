//! Core error taxonomy.
//!
//! Low-level storage and crypto errors are translated into these variants
//! at the component boundary; raw engine codes never cross it. Display
//! strings are short and non-technical — verbose context belongs in debug
//! logging, fingerprinted.

use palisade_crypto::CryptoError;
use palisade_vault::VaultError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Security key detection failed: {0}")]
    DetectionFailed(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Wallet binding failed: {0}")]
    BindingFailed(String),

    #[error("Key not found")]
    KeyNotFound,

    #[error("Operation cancelled")]
    UserCancelled,

    #[error("This security key is not supported")]
    UnsupportedDevice,

    #[error("Security hardware is unavailable")]
    HardwareUnavailable,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("The operation timed out")]
    Timeout,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Transaction must be simulated before signing")]
    SimulationRequired,

    #[error("Wallet is already bound to a security key")]
    AlreadyBound,
}

impl From<VaultError> for WalletError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::ItemNotFound => WalletError::KeyNotFound,
            VaultError::AuthFailed => {
                WalletError::VerificationFailed("Platform authentication failed".into())
            }
            VaultError::UserCancelled => WalletError::UserCancelled,
            VaultError::Timeout => WalletError::Timeout,
            VaultError::HardwareUnavailable => WalletError::HardwareUnavailable,
            VaultError::UnderlyingStore(code) => {
                WalletError::BindingFailed(format!("Secure storage failure ({code})"))
            }
            VaultError::Envelope(_) => {
                WalletError::BindingFailed("Corrupted secure storage record".into())
            }
            VaultError::Crypto(e) => e.into(),
        }
    }
}

impl From<CryptoError> for WalletError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPhrase => {
                WalletError::DerivationFailed("Invalid recovery phrase".into())
            }
            CryptoError::DegenerateKey => {
                WalletError::DerivationFailed("Derived key failed the entropy check".into())
            }
            other => WalletError::DerivationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_codes_never_leak_through_display() {
        let err: WalletError = VaultError::UnderlyingStore(-25300).into();
        // The numeric code survives as data for debug logs, but the
        // message stays short and self-describing.
        assert!(matches!(err, WalletError::BindingFailed(_)));
    }

    #[test]
    fn cancellation_and_timeout_pass_through() {
        assert!(matches!(
            WalletError::from(VaultError::UserCancelled),
            WalletError::UserCancelled
        ));
        assert!(matches!(
            WalletError::from(VaultError::Timeout),
            WalletError::Timeout
        ));
    }

    #[test]
    fn invalid_phrase_translates_to_derivation_failure() {
        let err: WalletError = CryptoError::InvalidPhrase.into();
        assert!(matches!(err, WalletError::DerivationFailed(_)));
    }
}
