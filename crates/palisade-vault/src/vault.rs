//! SecretVault — envelope encryption over the platform credential store.
//!
//! Record wire format:
//!   [ magic (8) | wrapped-key length (u16 BE) | wrapped key | nonce (24) | ciphertext + tag ]
//!
//! Every `store` draws a fresh 32-byte data key, encrypts the plaintext
//! with XChaCha20-Poly1305 (record id as AAD, so a record pasted under a
//! different id fails authentication), wraps the data key against the
//! keystore and persists only ciphertext. `retrieve` is the sole
//! auth-gated path: it suspends on the platform gesture inside
//! `HardwareKeystore::unwrap_data_key`.
//!
//! An index record tracks live identifiers; platform keyrings cannot
//! enumerate entries, so `delete_all` walks the index.

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    XChaCha20Poly1305,
};
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use palisade_crypto::hskdf::log_fingerprint;

use crate::credential_store::{CredentialStore, StoreStatus};
use crate::error::VaultError;
use crate::keystore::HardwareKeystore;

const ENVELOPE_MAGIC: &[u8] = b"PLSDE01\0";
const ID_PREFIX: &str = "palisade.secret.";
const INDEX_ID: &str = "palisade.secret-index";

pub struct SecretVault {
    store: Arc<dyn CredentialStore>,
    keystore: Arc<dyn HardwareKeystore>,
}

impl SecretVault {
    pub fn new(store: Arc<dyn CredentialStore>, keystore: Arc<dyn HardwareKeystore>) -> Self {
        Self { store, keystore }
    }

    /// True when the wrapping key lives in dedicated hardware.
    pub fn is_protected(&self) -> bool {
        self.keystore.is_hardware_backed()
    }

    /// Encrypt and persist. An existing record under the same id is
    /// replaced in place.
    pub fn store(&self, secret_id: &str, plaintext: &[u8]) -> Result<(), VaultError> {
        let mut data_key = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(data_key.as_mut());

        let cipher = XChaCha20Poly1305::new_from_slice(data_key.as_ref())
            .map_err(|e| VaultError::Envelope(e.to_string()))?;
        let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                chacha20poly1305::aead::Payload {
                    msg: plaintext,
                    aad: secret_id.as_bytes(),
                },
            )
            .map_err(|_| VaultError::Envelope("Record encryption failed".into()))?;

        let wrapped = self.keystore.wrap_data_key(&data_key)?;

        let mut record = Vec::with_capacity(8 + 2 + wrapped.len() + 24 + ciphertext.len());
        record.extend_from_slice(ENVELOPE_MAGIC);
        record.extend_from_slice(&(wrapped.len() as u16).to_be_bytes());
        record.extend_from_slice(&wrapped);
        record.extend_from_slice(&nonce);
        record.extend_from_slice(&ciphertext);

        let store_id = qualified(secret_id);
        match self.store.add(&store_id, &record) {
            StoreStatus::Success => {}
            StoreStatus::Duplicate => match self.store.replace(&store_id, &record) {
                StoreStatus::Success => {}
                status => return Err(translate(status)),
            },
            status => return Err(translate(status)),
        }
        self.index_insert(secret_id)?;

        debug!(
            secret = %log_fingerprint(secret_id.as_bytes()),
            "stored vault record"
        );
        Ok(())
    }

    /// Decrypt a record. Suspends on the platform authentication gesture.
    pub async fn retrieve(&self, secret_id: &str) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let outcome = self.store.fetch(&qualified(secret_id));
        let record = match outcome.status {
            StoreStatus::Success => outcome.value.ok_or(VaultError::ItemNotFound)?,
            status => return Err(translate(status)),
        };

        let (wrapped, nonce, ciphertext) = split_record(&record)?;
        let data_key = self
            .keystore
            .unwrap_data_key(wrapped, "Unlock wallet secret")
            .await?;

        let cipher = XChaCha20Poly1305::new_from_slice(data_key.as_ref())
            .map_err(|e| VaultError::Envelope(e.to_string()))?;
        let plaintext = cipher
            .decrypt(
                chacha20poly1305::XNonce::from_slice(nonce),
                chacha20poly1305::aead::Payload {
                    msg: ciphertext,
                    aad: secret_id.as_bytes(),
                },
            )
            .map_err(|_| VaultError::AuthFailed)?;
        Ok(Zeroizing::new(plaintext))
    }

    /// UTF-8 convenience over `store`.
    pub fn store_string(&self, secret_id: &str, value: &str) -> Result<(), VaultError> {
        self.store(secret_id, value.as_bytes())
    }

    /// UTF-8 convenience over `retrieve`.
    pub async fn retrieve_string(&self, secret_id: &str) -> Result<Zeroizing<String>, VaultError> {
        let bytes = self.retrieve(secret_id).await?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| VaultError::Envelope("Record is not valid UTF-8".into()))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    pub fn delete(&self, secret_id: &str) -> Result<(), VaultError> {
        match self.store.remove(&qualified(secret_id)) {
            StoreStatus::Success => {
                self.index_remove(secret_id)?;
                debug!(
                    secret = %log_fingerprint(secret_id.as_bytes()),
                    "deleted vault record"
                );
                Ok(())
            }
            status => Err(translate(status)),
        }
    }

    /// Remove every record tracked by the index, then the index itself.
    pub fn delete_all(&self) -> Result<(), VaultError> {
        let ids = self.index_load()?;
        for id in &ids {
            match self.store.remove(&qualified(id)) {
                StoreStatus::Success | StoreStatus::NotFound => {}
                status => {
                    warn!(status = status.code(), "delete_all: record removal failed");
                    return Err(translate(status));
                }
            }
        }
        match self.store.remove(INDEX_ID) {
            StoreStatus::Success | StoreStatus::NotFound => Ok(()),
            status => Err(translate(status)),
        }
    }

    // ── Index bookkeeping ────────────────────────────────────────────────────

    fn index_load(&self) -> Result<Vec<String>, VaultError> {
        let outcome = self.store.fetch(INDEX_ID);
        match outcome.status {
            StoreStatus::Success => {
                let bytes = outcome.value.unwrap_or_default();
                serde_json::from_slice(&bytes)
                    .map_err(|e| VaultError::Envelope(format!("Corrupt vault index: {e}")))
            }
            StoreStatus::NotFound => Ok(Vec::new()),
            status => Err(translate(status)),
        }
    }

    fn index_save(&self, ids: &[String]) -> Result<(), VaultError> {
        let bytes = serde_json::to_vec(ids)
            .map_err(|e| VaultError::Envelope(format!("Index encode: {e}")))?;
        match self.store.add(INDEX_ID, &bytes) {
            StoreStatus::Success => Ok(()),
            StoreStatus::Duplicate => match self.store.replace(INDEX_ID, &bytes) {
                StoreStatus::Success => Ok(()),
                status => Err(translate(status)),
            },
            status => Err(translate(status)),
        }
    }

    fn index_insert(&self, secret_id: &str) -> Result<(), VaultError> {
        let mut ids = self.index_load()?;
        if !ids.iter().any(|id| id == secret_id) {
            ids.push(secret_id.to_string());
            self.index_save(&ids)?;
        }
        Ok(())
    }

    fn index_remove(&self, secret_id: &str) -> Result<(), VaultError> {
        let mut ids = self.index_load()?;
        ids.retain(|id| id != secret_id);
        self.index_save(&ids)
    }
}

fn qualified(secret_id: &str) -> String {
    format!("{ID_PREFIX}{secret_id}")
}

fn split_record(record: &[u8]) -> Result<(&[u8], &[u8], &[u8]), VaultError> {
    if record.len() < 8 + 2 || &record[..8] != ENVELOPE_MAGIC {
        return Err(VaultError::Envelope("Bad envelope magic".into()));
    }
    let wrapped_len = u16::from_be_bytes([record[8], record[9]]) as usize;
    let body = &record[10..];
    if body.len() < wrapped_len + 24 + 16 {
        return Err(VaultError::Envelope("Truncated envelope".into()));
    }
    let (wrapped, rest) = body.split_at(wrapped_len);
    let (nonce, ciphertext) = rest.split_at(24);
    Ok((wrapped, nonce, ciphertext))
}

fn translate(status: StoreStatus) -> VaultError {
    match status {
        StoreStatus::NotFound => VaultError::ItemNotFound,
        StoreStatus::AuthFailed => VaultError::AuthFailed,
        status => VaultError::UnderlyingStore(status.code()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential_store::MemoryStore;
    use crate::keystore::{Authorizer, SoftwareKeystore};
    use async_trait::async_trait;
    use std::time::Duration;

    fn vault_with_memory() -> (SecretVault, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let keystore = Arc::new(SoftwareKeystore::ephemeral());
        (SecretVault::new(store.clone(), keystore), store)
    }

    #[tokio::test]
    async fn store_retrieve_round_trip() {
        let (vault, _) = vault_with_memory();
        vault.store("wallet-a", b"recovery material").unwrap();
        let plaintext = vault.retrieve("wallet-a").await.unwrap();
        assert_eq!(&*plaintext, b"recovery material");
    }

    #[tokio::test]
    async fn string_round_trip() {
        let (vault, _) = vault_with_memory();
        vault.store_string("phrase", "abandon ability able").unwrap();
        let text = vault.retrieve_string("phrase").await.unwrap();
        assert_eq!(&*text, "abandon ability able");
    }

    #[tokio::test]
    async fn persisted_bytes_are_never_plaintext() {
        let (vault, store) = vault_with_memory();
        vault.store("wallet-a", b"recovery material").unwrap();
        let raw = store.raw("palisade.secret.wallet-a").unwrap();
        assert!(!raw
            .windows(b"recovery material".len())
            .any(|w| w == b"recovery material"));
    }

    #[tokio::test]
    async fn same_plaintext_encrypts_differently_each_time() {
        let (vault, store) = vault_with_memory();
        vault.store("wallet-a", b"same bytes").unwrap();
        let first = store.raw("palisade.secret.wallet-a").unwrap();
        vault.store("wallet-a", b"same bytes").unwrap();
        let second = store.raw("palisade.secret.wallet-a").unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn duplicate_store_updates_in_place() {
        let (vault, _) = vault_with_memory();
        vault.store("wallet-a", b"old").unwrap();
        vault.store("wallet-a", b"new").unwrap();
        let plaintext = vault.retrieve("wallet-a").await.unwrap();
        assert_eq!(&*plaintext, b"new");
    }

    #[tokio::test]
    async fn missing_record_is_item_not_found() {
        let (vault, _) = vault_with_memory();
        assert!(matches!(
            vault.retrieve("nope").await,
            Err(VaultError::ItemNotFound)
        ));
        assert!(matches!(
            vault.delete("nope"),
            Err(VaultError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let (vault, _) = vault_with_memory();
        vault.store("wallet-a", b"secret").unwrap();
        vault.delete("wallet-a").unwrap();
        assert!(matches!(
            vault.retrieve("wallet-a").await,
            Err(VaultError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn delete_all_clears_every_record() {
        let (vault, store) = vault_with_memory();
        vault.store("a", b"1").unwrap();
        vault.store("b", b"2").unwrap();
        vault.delete_all().unwrap();
        assert!(matches!(
            vault.retrieve("a").await,
            Err(VaultError::ItemNotFound)
        ));
        assert!(matches!(
            vault.retrieve("b").await,
            Err(VaultError::ItemNotFound)
        ));
        assert!(store.raw(INDEX_ID).is_none());
    }

    #[tokio::test]
    async fn software_keystore_reports_unprotected() {
        let (vault, _) = vault_with_memory();
        assert!(!vault.is_protected());
    }

    struct DenyAll;

    #[async_trait]
    impl Authorizer for DenyAll {
        async fn authorize(&self, _reason: &str) -> Result<(), VaultError> {
            Err(VaultError::AuthFailed)
        }
    }

    #[tokio::test]
    async fn denied_gesture_blocks_retrieve() {
        let store = Arc::new(MemoryStore::new());
        let keystore = Arc::new(SoftwareKeystore::new(
            Arc::new(DenyAll),
            Duration::from_secs(5),
        ));
        let vault = SecretVault::new(store, keystore);
        vault.store("wallet-a", b"secret").unwrap();
        assert!(matches!(
            vault.retrieve("wallet-a").await,
            Err(VaultError::AuthFailed)
        ));
    }

    #[tokio::test]
    async fn record_moved_to_another_id_fails_decryption() {
        let (vault, store) = vault_with_memory();
        vault.store("wallet-a", b"secret").unwrap();
        let raw = store.raw("palisade.secret.wallet-a").unwrap();
        store.add("palisade.secret.wallet-b", &raw);
        // AAD binds the record to its id.
        assert!(matches!(
            vault.retrieve("wallet-b").await,
            Err(VaultError::AuthFailed)
        ));
    }
}
