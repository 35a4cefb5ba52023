//! Wallet-binding key derivation from hardware-security-key proofs.
//!
//! `derive_signature_based` — HKDF-SHA256 (extract-then-expand) over the
//!   authenticator's signed assertion concatenated with the session
//!   challenge, salted with the per-session salt. The common path for
//!   external FIDO2 keys.
//!
//! `derive_prf_based` — HKDF expansion of a WebAuthn PRF-extension output.
//!   The PRF output itself never leaves the authenticator's secure element;
//!   only its expansion does.
//!
//! `derive_legacy` — credential-id-only derivation. Migration of
//!   pre-existing bindings ONLY; never offered for new wallets.
//!
//! Each derivation uses a fixed domain-separation string so material from
//! one strategy can never collide with another.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::keys::KeyHandle;

pub const CHALLENGE_LEN: usize = 32;
pub const SESSION_SALT_LEN: usize = 32;

const SIGNATURE_DOMAIN: &[u8] = b"palisade-hsk-sig-v1";
const PRF_DOMAIN: &[u8] = b"palisade-hsk-prf-v1";
const LEGACY_DOMAIN: &[u8] = b"palisade-hsk-legacy-v1";
const VERIFY_INFO: &[u8] = b"palisade-hsk-verify-v1";

/// Output of a successful HSK derivation: the 32-byte wallet-binding key
/// handle plus a non-secret digest used to re-verify the binding later.
pub struct HskDerivation {
    pub key: KeyHandle,
    pub verification_digest: [u8; 32],
}

/// Fresh 32-byte session challenge.
pub fn generate_challenge() -> [u8; CHALLENGE_LEN] {
    let mut challenge = [0u8; CHALLENGE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut challenge);
    challenge
}

/// Fresh 32-byte per-session derivation salt.
pub fn generate_session_salt() -> [u8; SESSION_SALT_LEN] {
    let mut salt = [0u8; SESSION_SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive a binding key from a signed assertion + session challenge.
pub fn derive_signature_based(
    assertion_data: &[u8],
    challenge: &[u8; CHALLENGE_LEN],
    salt: &[u8; SESSION_SALT_LEN],
) -> Result<HskDerivation, CryptoError> {
    if assertion_data.is_empty() {
        return Err(CryptoError::InvalidKey(
            "Empty assertion data".into(),
        ));
    }
    let mut ikm = Zeroizing::new(Vec::with_capacity(assertion_data.len() + CHALLENGE_LEN));
    ikm.extend_from_slice(assertion_data);
    ikm.extend_from_slice(challenge);
    expand_with(salt, &ikm, SIGNATURE_DOMAIN)
}

/// Derive a binding key from a hardware PRF-extension output.
pub fn derive_prf_based(
    prf_output: &[u8; 32],
    salt: &[u8; SESSION_SALT_LEN],
) -> Result<HskDerivation, CryptoError> {
    expand_with(salt, prf_output, PRF_DOMAIN)
}

/// Credential-id-only derivation, for migrating pre-existing bindings.
pub fn derive_legacy(credential_id: &[u8]) -> Result<HskDerivation, CryptoError> {
    if credential_id.is_empty() {
        return Err(CryptoError::InvalidKey("Empty credential id".into()));
    }
    expand_with(&[0u8; SESSION_SALT_LEN], credential_id, LEGACY_DOMAIN)
}

fn expand_with(
    salt: &[u8; SESSION_SALT_LEN],
    ikm: &[u8],
    domain: &[u8],
) -> Result<HskDerivation, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut key = [0u8; 32];
    hk.expand(domain, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut digest = [0u8; 32];
    hk.expand(VERIFY_INFO, &mut digest)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let key = KeyHandle::from_bytes(key);
    if key.is_all_zero() {
        return Err(CryptoError::DegenerateKey);
    }
    Ok(HskDerivation {
        key,
        verification_digest: digest,
    })
}

/// One-way hash of a raw credential identifier. The raw id is discarded
/// after this; only the hash is ever stored.
pub fn hash_credential_id(credential_id: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"palisade-cred-id-v1\x00");
    hasher.update(credential_id);
    hasher.finalize().into()
}

/// Constant-time comparison for digests and handles.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Short log-safe fingerprint of an identifier. Production logging carries
/// this instead of the identifier itself.
pub fn log_fingerprint(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hex::encode(&hash.as_bytes()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_derivation_is_deterministic() {
        let challenge = [7u8; 32];
        let salt = [9u8; 32];
        let a = derive_signature_based(b"assertion-bytes", &challenge, &salt).unwrap();
        let b = derive_signature_based(b"assertion-bytes", &challenge, &salt).unwrap();
        assert_eq!(a.key.as_bytes(), b.key.as_bytes());
        assert_eq!(a.verification_digest, b.verification_digest);
    }

    #[test]
    fn challenge_changes_the_key() {
        let salt = [9u8; 32];
        let a = derive_signature_based(b"assertion-bytes", &[1u8; 32], &salt).unwrap();
        let b = derive_signature_based(b"assertion-bytes", &[2u8; 32], &salt).unwrap();
        assert_ne!(a.key.as_bytes(), b.key.as_bytes());
    }

    #[test]
    fn strategies_are_domain_separated() {
        let salt = [9u8; 32];
        let sig = derive_signature_based(&[5u8; 32], &[0u8; 32], &salt).unwrap();
        let prf = derive_prf_based(&[5u8; 32], &salt).unwrap();
        assert_ne!(sig.key.as_bytes(), prf.key.as_bytes());
    }

    #[test]
    fn digest_never_equals_key() {
        let derived = derive_prf_based(&[3u8; 32], &[4u8; 32]).unwrap();
        assert_ne!(derived.key.as_bytes(), &derived.verification_digest);
    }

    #[test]
    fn legacy_rejects_empty_credential() {
        assert!(derive_legacy(&[]).is_err());
        assert!(derive_legacy(b"credential-id").is_ok());
    }

    #[test]
    fn credential_hash_is_one_way_and_stable() {
        let a = hash_credential_id(b"cred-1");
        let b = hash_credential_id(b"cred-1");
        let c = hash_credential_id(b"cred-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(&a[..], b"cred-1");
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_eq(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_eq(&[1, 2], &[1, 2, 3]));
    }

    #[test]
    fn fresh_challenges_differ() {
        assert_ne!(generate_challenge(), generate_challenge());
        assert_ne!(generate_session_salt(), generate_session_salt());
    }
}
