//! palisade-core — key management and transaction authorization
//!
//! The non-custodial core of the Palisade wallet: it owns every
//! cryptographic secret, binds wallets to external hardware security
//! keys, and gates each outgoing transaction through simulation and risk
//! analysis before signing. Network I/O, presentation and broadcast live
//! outside, behind the provider traits.
//!
//! # Module layout
//! - `hsk`      — hardware-security-key derivation engine + transport seam
//! - `registry` — wallet ↔ HSK binding registry (single-writer, persisted)
//! - `tx`       — simulate / route / analyze / sign / broadcast pipeline
//! - `guards`   — address-poisoning detector, timed clipboard clearing
//! - `provider` — chain-data and routing collaborator traits
//! - `config`   — tunables with safe defaults
//! - `error`    — unified error taxonomy
//!
//! # Invariants the types enforce
//! - Key handles and derived keys zeroize on drop and never serialize.
//! - Binding records have no field for secrets; the persisted list is
//!   structurally incapable of leaking them.
//! - Registry mutation is serialized; one HSK per address, ever.
//! - Signing requires a prior successful simulation of the exact same
//!   transaction bytes.

pub mod config;
pub mod error;
pub mod guards;
pub mod hsk;
pub mod provider;
pub mod registry;
pub mod tx;

pub use config::CoreConfig;
pub use error::WalletError;
