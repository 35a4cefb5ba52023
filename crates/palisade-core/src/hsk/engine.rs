//! HSK derivation engine.
//!
//! # State machine
//!
//! ```text
//! Initiation → AwaitingInsertion → DerivingKey → Verifying → Complete
//!                                                          ↘ Failed(kind)
//! ```
//!
//! Terminal states: `Complete`, `Failed`. Every transition is recorded in
//! order and published through a watch channel; the machine can never skip
//! from `AwaitingInsertion` straight to `Complete`.
//!
//! Hardware waits (registration and verification ceremonies) are the only
//! suspension points. Each registers a waiter that `cancel_operation`
//! resolves with `UserCancelled`; every wait is additionally bounded by
//! the configured hardware prompt timeout.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use palisade_crypto::hskdf::{self, log_fingerprint};
use palisade_crypto::KeyHandle;

use crate::config::CoreConfig;
use crate::error::WalletError;
use crate::hsk::transport::{
    recommended_strategy, DerivationStrategy, HskTransport, ProofOfPossession,
};

/// Minimum viable attestation size in bytes.
const MIN_PROOF_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Cancelled,
    Timeout,
    Derivation,
    Verification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HskPhase {
    Initiation,
    AwaitingInsertion,
    DerivingKey,
    Verifying,
    Complete,
    Failed(FailureKind),
}

impl HskPhase {
    fn in_flight(&self) -> bool {
        matches!(
            self,
            HskPhase::AwaitingInsertion | HskPhase::DerivingKey | HskPhase::Verifying
        )
    }
}

/// Result of a successful derivation. The raw credential id has already
/// been hashed and discarded; the session salt is carried out only so the
/// registry can persist it to the credential store.
#[derive(Debug)]
pub struct DerivationOutcome {
    pub key: KeyHandle,
    pub credential_id_hash: [u8; 32],
    /// Effective strategy. A PRF request that fell back to
    /// signature-based derivation reports `SignatureBased` here — the
    /// claim is never silently upgraded.
    pub strategy: DerivationStrategy,
    pub verification_digest: [u8; 32],
    pub session_salt: Zeroizing<[u8; 32]>,
}

#[derive(Default)]
struct Session {
    challenge: Option<Zeroizing<[u8; 32]>>,
    salt: Option<Zeroizing<[u8; 32]>>,
}

pub struct HskDerivationEngine {
    transport: Arc<dyn HskTransport>,
    phase_tx: watch::Sender<HskPhase>,
    transitions: Mutex<Vec<HskPhase>>,
    session: Mutex<Session>,
    waiters: Mutex<Vec<oneshot::Sender<()>>>,
    hardware_timeout: Duration,
}

impl HskDerivationEngine {
    pub fn new(transport: Arc<dyn HskTransport>, config: &CoreConfig) -> Self {
        let (phase_tx, _) = watch::channel(HskPhase::Initiation);
        Self {
            transport,
            phase_tx,
            transitions: Mutex::new(Vec::new()),
            session: Mutex::new(Session::default()),
            waiters: Mutex::new(Vec::new()),
            hardware_timeout: Duration::from_secs(config.hardware.prompt_timeout_secs),
        }
    }

    pub fn phase(&self) -> HskPhase {
        *self.phase_tx.borrow()
    }

    /// Subscribe to phase changes.
    pub fn subscribe(&self) -> watch::Receiver<HskPhase> {
        self.phase_tx.subscribe()
    }

    /// Ordered transition log since the last reset.
    pub fn transitions(&self) -> Vec<HskPhase> {
        self.transitions.lock().clone()
    }

    fn transition(&self, next: HskPhase) {
        self.transitions.lock().push(next);
        self.phase_tx.send_replace(next);
    }

    fn fail(&self, err: &WalletError) {
        if !self.phase().in_flight() {
            return;
        }
        let kind = match err {
            WalletError::UserCancelled => FailureKind::Cancelled,
            WalletError::Timeout => FailureKind::Timeout,
            WalletError::VerificationFailed(_) => FailureKind::Verification,
            _ => FailureKind::Derivation,
        };
        self.transition(HskPhase::Failed(kind));
    }

    /// Wait for the user to insert and tap the hardware key.
    ///
    /// Generates a fresh 32-byte challenge and per-session derivation
    /// salt, enters `AwaitingInsertion` and runs the registration
    /// ceremony. Cancelable; bounded by the hardware prompt timeout.
    pub async fn listen_for_hsk(&self) -> Result<ProofOfPossession, WalletError> {
        let challenge = hskdf::generate_challenge();
        let salt = hskdf::generate_session_salt();
        {
            let mut session = self.session.lock();
            session.challenge = Some(Zeroizing::new(challenge));
            session.salt = Some(Zeroizing::new(salt));
        }
        let caps = self.transport.capabilities();
        let prf_salt = if caps.prf_extension && caps.platform_prf {
            Some(salt)
        } else {
            None
        };

        self.transition(HskPhase::AwaitingInsertion);

        let ceremony = self
            .transport
            .request_attestation(&challenge, prf_salt.as_ref());
        match self.guarded(ceremony).await {
            Ok(proof) => Ok(proof),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Derive the wallet-binding key from a proof of possession.
    ///
    /// Validation gates, in order, each with a distinct error:
    /// 1. attestation present and at least 64 bytes,
    /// 2. session challenge set and exactly 32 bytes,
    /// 3. session salt set and exactly 32 bytes.
    pub fn derive_key(&self, proof: &ProofOfPossession) -> Result<DerivationOutcome, WalletError> {
        if self.phase() != HskPhase::AwaitingInsertion {
            return Err(WalletError::DerivationFailed(
                "No security key pairing in progress".into(),
            ));
        }
        if proof.attestation.len() < MIN_PROOF_LEN {
            let err = WalletError::InvalidCredential(
                "Attestation below minimum viable size".into(),
            );
            self.fail(&err);
            return Err(err);
        }

        // The buffers are fixed 32-byte arrays; "set and exactly 32 bytes"
        // reduces to presence here.
        let (session_challenge, session_salt) = {
            let session = self.session.lock();
            (
                session.challenge.as_ref().map(|c| **c),
                session.salt.as_ref().map(|s| **s),
            )
        };
        let challenge = match session_challenge {
            Some(c) => c,
            None => {
                let err = WalletError::DerivationFailed("No active challenge".into());
                self.fail(&err);
                return Err(err);
            }
        };
        let salt = match session_salt {
            Some(s) => s,
            None => {
                let err = WalletError::DerivationFailed("No session derivation salt".into());
                self.fail(&err);
                return Err(err);
            }
        };

        self.transition(HskPhase::DerivingKey);

        let caps = self.transport.capabilities();
        let (derived, strategy) = match (recommended_strategy(&caps), proof.prf_output.as_ref()) {
            (DerivationStrategy::PrfExtension, Some(prf)) => (
                hskdf::derive_prf_based(prf, &salt),
                DerivationStrategy::PrfExtension,
            ),
            (recommended, _) => {
                if recommended == DerivationStrategy::PrfExtension {
                    debug!("PRF output unavailable; falling back to signature-based derivation");
                }
                (
                    hskdf::derive_signature_based(&proof.attestation, &challenge, &salt),
                    DerivationStrategy::SignatureBased,
                )
            }
        };

        let derived = match derived {
            Ok(d) => d,
            Err(e) => {
                let err: WalletError = e.into();
                self.fail(&err);
                return Err(err);
            }
        };

        // One-way hash; the raw credential id goes no further.
        let credential_id_hash = hskdf::hash_credential_id(&proof.credential_id);

        self.transition(HskPhase::Complete);
        debug!(
            credential = %log_fingerprint(&credential_id_hash),
            strategy = ?strategy,
            "derived wallet-binding key"
        );

        Ok(DerivationOutcome {
            key: derived.key,
            credential_id_hash,
            strategy,
            verification_digest: derived.verification_digest,
            session_salt: Zeroizing::new(salt),
        })
    }

    /// Re-derive the key of a pre-existing credential-id-only binding.
    ///
    /// Migration path ONLY: new wallets never get this strategy, and no
    /// selector ever recommends it. Does not touch the state machine —
    /// there is no ceremony, just deterministic re-derivation.
    pub fn derive_legacy_migration(
        &self,
        credential_id: &[u8],
    ) -> Result<DerivationOutcome, WalletError> {
        let derived = hskdf::derive_legacy(credential_id).map_err(WalletError::from)?;
        let credential_id_hash = hskdf::hash_credential_id(credential_id);
        Ok(DerivationOutcome {
            key: derived.key,
            credential_id_hash,
            strategy: DerivationStrategy::Legacy,
            verification_digest: derived.verification_digest,
            session_salt: Zeroizing::new([0u8; 32]),
        })
    }

    /// Prove the bound hardware key is still present: fresh assertion
    /// round-trip through `Verifying`.
    pub async fn verify_binding(
        &self,
        key_handle: &KeyHandle,
        expected_credential_hash: &[u8; 32],
    ) -> Result<(), WalletError> {
        if key_handle.is_all_zero() {
            return Err(WalletError::VerificationFailed(
                "Degenerate key handle".into(),
            ));
        }
        if self.phase().in_flight() {
            return Err(WalletError::VerificationFailed(
                "Another security key operation is in progress".into(),
            ));
        }

        self.transition(HskPhase::Verifying);
        let challenge = hskdf::generate_challenge();

        let proof = match self.guarded(self.transport.request_assertion(&challenge)).await {
            Ok(p) => p,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        if proof.assertion.len() < MIN_PROOF_LEN {
            let err =
                WalletError::VerificationFailed("Assertion below minimum viable size".into());
            self.fail(&err);
            return Err(err);
        }
        let presented = hskdf::hash_credential_id(&proof.credential_id);
        if !hskdf::constant_time_eq(&presented, expected_credential_hash) {
            let err = WalletError::VerificationFailed(
                "Security key does not match this wallet".into(),
            );
            self.fail(&err);
            return Err(err);
        }

        self.transition(HskPhase::Complete);
        Ok(())
    }

    /// Abort any in-flight operation. Idempotent: synchronously tears
    /// down the hardware request, resolves every pending waiter with
    /// `UserCancelled` and resets to `Initiation`.
    pub fn cancel_operation(&self) {
        self.transport.cancel();
        for waiter in self.waiters.lock().drain(..) {
            let _ = waiter.send(());
        }
        let phase = self.phase();
        if phase.in_flight() || phase == HskPhase::Initiation {
            if phase != HskPhase::Initiation {
                self.transition(HskPhase::Failed(FailureKind::Cancelled));
            }
            self.clear_session();
            self.transition(HskPhase::Initiation);
        } else {
            self.clear_session();
        }
    }

    /// Drop all session state, zeroizing the challenge and salt buffers,
    /// and return to `Initiation`.
    pub fn reset(&self) {
        for waiter in self.waiters.lock().drain(..) {
            let _ = waiter.send(());
        }
        self.clear_session();
        self.transitions.lock().clear();
        self.phase_tx.send_replace(HskPhase::Initiation);
    }

    fn clear_session(&self) {
        let mut session = self.session.lock();
        // Zeroizing buffers wipe on drop.
        session.challenge = None;
        session.salt = None;
    }

    /// Race a hardware ceremony against cancellation and the prompt
    /// timeout. A stuck prompt can never deadlock the caller.
    async fn guarded<T>(
        &self,
        ceremony: impl Future<Output = Result<T, WalletError>>,
    ) -> Result<T, WalletError> {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.waiters.lock().push(cancel_tx);

        let result = tokio::select! {
            _ = cancel_rx => Err(WalletError::UserCancelled),
            outcome = tokio::time::timeout(self.hardware_timeout, ceremony) => match outcome {
                Ok(r) => r,
                Err(_) => {
                    warn!("hardware prompt timed out");
                    Err(WalletError::Timeout)
                }
            },
        };
        self.waiters.lock().retain(|w| !w.is_closed());
        result
    }
}
