//! palisade-vault — hardware-backed secret storage
//!
//! Envelope encryption: every secret is encrypted under a fresh per-record
//! data key; the data key is wrapped against a non-exportable asymmetric
//! key that never leaves the hardware keystore. The platform credential
//! store only ever holds ciphertext.
//!
//! # Module layout
//! - `credential_store` — platform credential-store trait + keyring / in-memory impls
//! - `keystore`         — non-exportable key + authentication gate
//! - `vault`            — the `SecretVault` envelope layer
//! - `error`            — unified error type

pub mod credential_store;
pub mod error;
pub mod keystore;
pub mod vault;

pub use credential_store::{CredentialStore, KeyringStore, MemoryStore, StoreStatus};
pub use error::VaultError;
pub use keystore::{AlwaysApprove, Authorizer, HardwareKeystore, SoftwareKeystore};
pub use vault::SecretVault;
