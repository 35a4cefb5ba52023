//! Non-exportable keystore + authentication gate.
//!
//! The keystore owns a single asymmetric key with lifecycle = process
//! lifetime. Wrapping a data key needs only the public half; unwrapping
//! requires the private half AND a platform authentication gesture
//! (biometric / PIN / hardware tap). The gesture is modelled explicitly:
//! an async `Authorizer` that may suspend until the platform responds,
//! bounded by the keystore's prompt timeout.
//!
//! Wrapped-key wire format:
//!   [ ephemeral X25519 public (32) | nonce (24) | ciphertext + tag ]
//!
//! The wrap key is HKDF-SHA256(DH(ephemeral, keystore), salt = both
//! publics, info = domain string) — the keystore private scalar never
//! appears outside `SoftwareKeystore`; an enclave-backed implementation
//! replaces this struct without touching the trait.

use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    XChaCha20Poly1305,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::VaultError;

const ENVELOPE_DOMAIN: &[u8] = b"palisade-envelope-v1";
const WRAPPED_LEN: usize = 32 + 24 + 32 + 16;

/// Platform authentication gesture. May suspend indefinitely until the
/// platform authenticator responds; callers bound it with a timeout.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, reason: &str) -> Result<(), VaultError>;
}

/// No-op authorizer for headless use and keys without an auth policy.
pub struct AlwaysApprove;

#[async_trait]
impl Authorizer for AlwaysApprove {
    async fn authorize(&self, _reason: &str) -> Result<(), VaultError> {
        Ok(())
    }
}

/// Non-exportable asymmetric key operations.
#[async_trait]
pub trait HardwareKeystore: Send + Sync {
    /// Whether the private key lives in dedicated hardware.
    fn is_hardware_backed(&self) -> bool;

    /// Public half, safe to share with any caller.
    fn public_key(&self) -> [u8; 32];

    /// Wrap a 32-byte data key against the keystore public key.
    /// Public-key operation: no authentication required.
    fn wrap_data_key(&self, data_key: &[u8; 32]) -> Result<Vec<u8>, VaultError>;

    /// Unwrap a data key. Suspends on the authentication gesture; fails
    /// with `Timeout` when the prompt outlives the keystore's bound.
    async fn unwrap_data_key(
        &self,
        wrapped: &[u8],
        reason: &str,
    ) -> Result<Zeroizing<[u8; 32]>, VaultError>;
}

/// Software fallback for platforms without an enclave. Key material is
/// process-resident but never exported past this struct.
pub struct SoftwareKeystore {
    secret: StaticSecret,
    public: PublicKey,
    authorizer: Arc<dyn Authorizer>,
    prompt_timeout: Duration,
}

impl SoftwareKeystore {
    pub fn new(authorizer: Arc<dyn Authorizer>, prompt_timeout: Duration) -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            secret,
            public,
            authorizer,
            prompt_timeout,
        }
    }

    /// Keystore with no auth policy, for tests and headless tooling.
    pub fn ephemeral() -> Self {
        Self::new(Arc::new(AlwaysApprove), Duration::from_secs(30))
    }

    fn derive_wrap_key(
        shared: &[u8; 32],
        ephemeral_pub: &[u8; 32],
        keystore_pub: &[u8; 32],
    ) -> Result<Zeroizing<[u8; 32]>, VaultError> {
        let mut salt = [0u8; 64];
        salt[..32].copy_from_slice(ephemeral_pub);
        salt[32..].copy_from_slice(keystore_pub);
        let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
        let mut wrap_key = Zeroizing::new([0u8; 32]);
        hk.expand(ENVELOPE_DOMAIN, wrap_key.as_mut())
            .map_err(|e| VaultError::Envelope(e.to_string()))?;
        Ok(wrap_key)
    }
}

#[async_trait]
impl HardwareKeystore for SoftwareKeystore {
    fn is_hardware_backed(&self) -> bool {
        false
    }

    fn public_key(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    fn wrap_data_key(&self, data_key: &[u8; 32]) -> Result<Vec<u8>, VaultError> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_pub = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&self.public);
        let wrap_key = Self::derive_wrap_key(
            shared.as_bytes(),
            &ephemeral_pub.to_bytes(),
            &self.public.to_bytes(),
        )?;

        let cipher = XChaCha20Poly1305::new_from_slice(wrap_key.as_ref())
            .map_err(|e| VaultError::Envelope(e.to_string()))?;
        let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);
        let ciphertext = cipher
            .encrypt(&nonce, data_key.as_slice())
            .map_err(|_| VaultError::Envelope("Wrap encryption failed".into()))?;

        let mut out = Vec::with_capacity(WRAPPED_LEN);
        out.extend_from_slice(&ephemeral_pub.to_bytes());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    async fn unwrap_data_key(
        &self,
        wrapped: &[u8],
        reason: &str,
    ) -> Result<Zeroizing<[u8; 32]>, VaultError> {
        if wrapped.len() != WRAPPED_LEN {
            return Err(VaultError::Envelope(format!(
                "Wrapped key must be {WRAPPED_LEN} bytes, got {}",
                wrapped.len()
            )));
        }

        // The gesture happens before any key math; a stuck prompt must
        // not hold the private scalar in play.
        tokio::time::timeout(self.prompt_timeout, self.authorizer.authorize(reason))
            .await
            .map_err(|_| VaultError::Timeout)??;

        let mut ephemeral_pub = [0u8; 32];
        ephemeral_pub.copy_from_slice(&wrapped[..32]);
        let shared = self.secret.diffie_hellman(&PublicKey::from(ephemeral_pub));
        let wrap_key = Self::derive_wrap_key(
            shared.as_bytes(),
            &ephemeral_pub,
            &self.public.to_bytes(),
        )?;

        let cipher = XChaCha20Poly1305::new_from_slice(wrap_key.as_ref())
            .map_err(|e| VaultError::Envelope(e.to_string()))?;
        let nonce = chacha20poly1305::XNonce::from_slice(&wrapped[32..56]);
        let plaintext = cipher
            .decrypt(nonce, &wrapped[56..])
            .map_err(|_| VaultError::AuthFailed)?;

        let mut data_key = Zeroizing::new([0u8; 32]);
        if plaintext.len() != 32 {
            return Err(VaultError::Envelope("Unwrapped key wrong length".into()));
        }
        data_key.copy_from_slice(&plaintext);
        Ok(data_key)
    }
}
