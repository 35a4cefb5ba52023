//! FIDO2/WebAuthn transport seam.
//!
//! The engine only consumes ceremony outputs — challenge in, credential id
//! and attestation/assertion bytes out. The transport owns the actual
//! authenticator protocol (CTAP2, platform API, …) and must tear down any
//! in-flight hardware request synchronously on `cancel()`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// How a wallet-binding key is derived from the hardware key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationStrategy {
    /// Credential-id-only derivation. Migration of pre-existing bindings
    /// ONLY — never offered for new wallets.
    Legacy,
    /// HKDF over the signed assertion + session challenge. The common
    /// path for external keys.
    SignatureBased,
    /// HKDF over a hardware-bound PRF-extension output.
    PrfExtension,
}

/// What the platform + authenticator pair can do.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatorCapabilities {
    /// Authenticator advertises the PRF extension.
    pub prf_extension: bool,
    /// Platform can actually surface PRF outputs to callers.
    pub platform_prf: bool,
}

/// Preferred strategy for a NEW binding. Legacy is never recommended,
/// under any capability combination.
pub fn recommended_strategy(caps: &AuthenticatorCapabilities) -> DerivationStrategy {
    if caps.prf_extension && caps.platform_prf {
        DerivationStrategy::PrfExtension
    } else {
        DerivationStrategy::SignatureBased
    }
}

/// Output of a registration ceremony: proof that the user possesses the
/// hardware key. The raw credential id is hashed and discarded by the
/// engine; it never reaches persistence.
#[derive(Debug, Clone)]
pub struct ProofOfPossession {
    pub credential_id: Vec<u8>,
    /// Signed attestation / assertion data. Minimum viable size is
    /// enforced by the engine.
    pub attestation: Vec<u8>,
    /// Present only when the authenticator evaluated the PRF extension.
    pub prf_output: Option<[u8; 32]>,
}

/// Output of a presence-check assertion ceremony.
#[derive(Debug, Clone)]
pub struct AssertionProof {
    pub credential_id: Vec<u8>,
    pub assertion: Vec<u8>,
}

#[async_trait]
pub trait HskTransport: Send + Sync {
    fn capabilities(&self) -> AuthenticatorCapabilities;

    /// Run a registration ceremony. Suspends until the user taps the key
    /// or the engine cancels/times out the wait.
    async fn request_attestation(
        &self,
        challenge: &[u8; 32],
        prf_salt: Option<&[u8; 32]>,
    ) -> Result<ProofOfPossession, WalletError>;

    /// Run an assertion ceremony against an existing credential.
    async fn request_assertion(
        &self,
        challenge: &[u8; 32],
    ) -> Result<AssertionProof, WalletError>;

    /// Synchronously abort any in-flight ceremony.
    fn cancel(&self);
}
