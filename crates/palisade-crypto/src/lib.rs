//! palisade-crypto — Palisade Wallet Core cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Key material never implements `Serialize` — persistence of raw keys
//!   is a type error, not a code-review finding.
//!
//! # Module layout
//! - `keys`    — chain enum, zeroized key newtypes (`KeyHandle`, `DerivedKeyMaterial`)
//! - `hd`      — BIP-39 recovery phrase handling + per-chain hierarchical derivation
//! - `address` — chain-correct address formatting (EIP-55, base58check, base58)
//! - `hskdf`   — HKDF derivation of wallet-binding keys from hardware-key proofs
//! - `error`   — unified error type

pub mod address;
pub mod error;
pub mod hd;
pub mod hskdf;
pub mod keys;

pub use error::CryptoError;
pub use keys::{Chain, DerivedKeyMaterial, KeyHandle};
