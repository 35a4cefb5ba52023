//! Wallet binding registry.
//!
//! Maps wallet addresses to HSK bindings and mediates every mutation
//! through a single tokio mutex: two concurrent completion attempts for
//! one address are linearized, and the loser fails with `AlreadyBound`
//! instead of overwriting.
//!
//! Storage split per record:
//! - key handle    → hardware-backed vault, keyed by wallet address
//! - derivation salt → platform credential store, under a generated ref
//! - binding metadata → JSON binding list (no secrets by construction)
//!
//! Removal runs vault → salt → record. An already-absent vault entry is
//! tolerated; any other storage failure aborts before the record is lost.

pub mod binding;
pub mod store;

pub use binding::HskBinding;
pub use store::BindingStore;

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use palisade_crypto::address::is_evm_address;
use palisade_crypto::hskdf::log_fingerprint;
use palisade_crypto::KeyHandle;
use palisade_vault::credential_store::{CredentialStore, StoreStatus};
use palisade_vault::{SecretVault, VaultError};

use crate::error::WalletError;
use crate::hsk::engine::DerivationOutcome;
use crate::hsk::transport::DerivationStrategy;

const HSK_ID_MIN: usize = 8;
const HSK_ID_MAX: usize = 256;

fn vault_key_id(address: &str) -> String {
    format!("binding-key.{}", address.to_lowercase())
}

pub struct WalletBindingRegistry {
    bindings: Mutex<Vec<HskBinding>>,
    vault: Arc<SecretVault>,
    salt_store: Arc<dyn CredentialStore>,
    persistence: BindingStore,
}

impl WalletBindingRegistry {
    /// Open the registry, loading any previously persisted bindings.
    pub fn open<P: AsRef<Path>>(
        vault: Arc<SecretVault>,
        salt_store: Arc<dyn CredentialStore>,
        path: P,
    ) -> Result<Self, WalletError> {
        let persistence = BindingStore::new(path);
        let loaded = persistence.load()?;
        Ok(Self {
            bindings: Mutex::new(loaded),
            vault,
            salt_store,
            persistence,
        })
    }

    /// Complete a new binding after successful derivation + validation.
    ///
    /// The key handle goes into the hardware-backed vault; the salt into
    /// the credential store; only then is the metadata record committed.
    pub async fn complete_binding(
        &self,
        hsk_id: &str,
        key_handle: &KeyHandle,
        address: &str,
        credential_id_hash: &[u8; 32],
        strategy: DerivationStrategy,
        salt: Option<&[u8; 32]>,
    ) -> Result<HskBinding, WalletError> {
        if hsk_id.len() < HSK_ID_MIN || hsk_id.len() > HSK_ID_MAX {
            return Err(WalletError::BindingFailed(
                "Security key identifier length out of range".into(),
            ));
        }
        if key_handle.is_all_zero() {
            return Err(WalletError::BindingFailed("Degenerate key handle".into()));
        }
        if !is_evm_address(address) {
            return Err(WalletError::InvalidAddress(address.into()));
        }
        if strategy != DerivationStrategy::Legacy && salt.is_none() {
            return Err(WalletError::BindingFailed(
                "Missing derivation salt".into(),
            ));
        }

        let mut bindings = self.bindings.lock().await;
        if bindings
            .iter()
            .any(|b| b.address.eq_ignore_ascii_case(address))
        {
            return Err(WalletError::AlreadyBound);
        }

        self.vault.store(&vault_key_id(address), key_handle.as_bytes())?;

        let derivation_salt_ref = match (strategy, salt) {
            (DerivationStrategy::Legacy, _) => None,
            (_, Some(salt)) => {
                let salt_ref = format!("palisade.binding-salt.{}", Uuid::new_v4());
                match self.salt_store.add(&salt_ref, salt) {
                    StoreStatus::Success => Some(salt_ref),
                    status => {
                        // Unwind the vault entry so a retry starts clean.
                        let _ = self.vault.delete(&vault_key_id(address));
                        return Err(WalletError::BindingFailed(format!(
                            "Salt storage failure ({})",
                            status.code()
                        )));
                    }
                }
            }
            (_, None) => None,
        };

        let now = Utc::now();
        let record = HskBinding {
            id: Uuid::new_v4(),
            hsk_id: hsk_id.to_string(),
            address: address.to_string(),
            credential_id_hash: hex::encode(credential_id_hash),
            strategy,
            derivation_salt_ref,
            created_at: now,
            last_used_at: now,
        };
        bindings.push(record.clone());

        if let Err(err) = self.persistence.save(&bindings) {
            bindings.pop();
            let _ = self.vault.delete(&vault_key_id(address));
            if let Some(ref salt_ref) = record.derivation_salt_ref {
                self.salt_store.remove(salt_ref);
            }
            return Err(err);
        }

        info!(
            wallet = %log_fingerprint(address.as_bytes()),
            hsk = %log_fingerprint(hsk_id.as_bytes()),
            strategy = ?strategy,
            "wallet bound to security key"
        );
        Ok(record)
    }

    /// Bind a freshly derived key to an existing wallet address.
    /// Same validation as `complete_binding`, taking the derivation
    /// outcome wholesale.
    pub async fn bind_to_existing_wallet(
        &self,
        hsk_id: &str,
        address: &str,
        outcome: &DerivationOutcome,
    ) -> Result<HskBinding, WalletError> {
        let salt = if outcome.strategy == DerivationStrategy::Legacy {
            None
        } else {
            Some(&*outcome.session_salt)
        };
        self.complete_binding(
            hsk_id,
            &outcome.key,
            address,
            &outcome.credential_id_hash,
            outcome.strategy,
            salt,
        )
        .await
    }

    pub async fn get_binding_by_address(&self, address: &str) -> Option<HskBinding> {
        self.bindings
            .lock()
            .await
            .iter()
            .find(|b| b.address.eq_ignore_ascii_case(address))
            .cloned()
    }

    pub async fn get_binding_by_hsk_id(&self, hsk_id: &str) -> Option<HskBinding> {
        self.bindings
            .lock()
            .await
            .iter()
            .find(|b| b.hsk_id == hsk_id)
            .cloned()
    }

    pub async fn is_wallet_bound(&self, address: &str) -> bool {
        self.get_binding_by_address(address).await.is_some()
    }

    /// Remove a binding: vault key, then salt, then the record.
    pub async fn remove_binding(&self, address: &str) -> Result<(), WalletError> {
        let mut bindings = self.bindings.lock().await;
        let position = bindings
            .iter()
            .position(|b| b.address.eq_ignore_ascii_case(address))
            .ok_or(WalletError::KeyNotFound)?;

        match self.vault.delete(&vault_key_id(address)) {
            Ok(()) => {}
            // Already absent — removal of the record still proceeds.
            Err(VaultError::ItemNotFound) => {
                warn!(
                    wallet = %log_fingerprint(address.as_bytes()),
                    "binding removal: vault entry already absent"
                );
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(ref salt_ref) = bindings[position].derivation_salt_ref {
            match self.salt_store.remove(salt_ref) {
                StoreStatus::Success | StoreStatus::NotFound => {}
                status => {
                    return Err(WalletError::BindingFailed(format!(
                        "Salt removal failure ({})",
                        status.code()
                    )))
                }
            }
        }

        bindings.remove(position);
        self.persistence.save(&bindings)?;
        info!(
            wallet = %log_fingerprint(address.as_bytes()),
            "binding removed"
        );
        Ok(())
    }

    pub async fn update_last_used(&self, address: &str) -> Result<(), WalletError> {
        let mut bindings = self.bindings.lock().await;
        let record = bindings
            .iter_mut()
            .find(|b| b.address.eq_ignore_ascii_case(address))
            .ok_or(WalletError::KeyNotFound)?;
        record.last_used_at = Utc::now();
        self.persistence.save(&bindings)
    }

    /// Fetch the stored derivation salt for an address, when present.
    pub async fn get_derivation_salt(
        &self,
        address: &str,
    ) -> Result<Option<Zeroizing<Vec<u8>>>, WalletError> {
        let salt_ref = {
            let bindings = self.bindings.lock().await;
            match bindings
                .iter()
                .find(|b| b.address.eq_ignore_ascii_case(address))
            {
                Some(binding) => match binding.derivation_salt_ref.clone() {
                    Some(r) => r,
                    None => return Ok(None),
                },
                None => return Ok(None),
            }
        };
        let outcome = self.salt_store.fetch(&salt_ref);
        match outcome.status {
            StoreStatus::Success => Ok(outcome.value.map(Zeroizing::new)),
            StoreStatus::NotFound => Ok(None),
            StoreStatus::AuthFailed => Err(WalletError::VerificationFailed(
                "Platform authentication failed".into(),
            )),
            status => Err(WalletError::BindingFailed(format!(
                "Salt fetch failure ({})",
                status.code()
            ))),
        }
    }

    /// Retrieve the vault-held key handle for a bound wallet. Suspends on
    /// the platform authentication gesture.
    pub async fn key_handle(&self, address: &str) -> Result<KeyHandle, WalletError> {
        if !self.is_wallet_bound(address).await {
            return Err(WalletError::KeyNotFound);
        }
        let bytes = self.vault.retrieve(&vault_key_id(address)).await?;
        KeyHandle::try_from(bytes.as_slice())
            .map_err(|_| WalletError::BindingFailed("Corrupted key handle".into()))
    }
}
