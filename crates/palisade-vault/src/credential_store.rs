//! Platform credential-store abstraction.
//!
//! The platform primitive speaks a small status-code taxonomy rather than
//! rich errors; translation into `VaultError` happens one layer up, in the
//! vault. Two implementations:
//!
//! - `KeyringStore` — OS credential store (Windows Credential Manager,
//!   macOS Keychain, Linux Secret Service) via the `keyring` crate.
//!   Values are base64-encoded because some backends are string-only.
//! - `MemoryStore` — in-process map for tests and headless environments.

use base64::{engine::general_purpose, Engine as _};
use keyring::Entry;
use parking_lot::RwLock;
use std::collections::HashMap;

const SERVICE_NAME: &str = "PalisadeWallet";

/// Status codes of the underlying store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Success,
    Duplicate,
    NotFound,
    AuthFailed,
    ParamError,
}

impl StoreStatus {
    /// Numeric code for logging and `UnderlyingStore` translation.
    pub fn code(&self) -> i32 {
        match self {
            StoreStatus::Success => 0,
            StoreStatus::Duplicate => -25299,
            StoreStatus::NotFound => -25300,
            StoreStatus::AuthFailed => -128,
            StoreStatus::ParamError => -50,
        }
    }
}

/// Result of a fetch: platform status plus the value when present.
#[derive(Debug)]
pub struct FetchOutcome {
    pub status: StoreStatus,
    pub value: Option<Vec<u8>>,
}

/// Minimal add/fetch/remove surface of a platform credential store.
pub trait CredentialStore: Send + Sync {
    /// Add a new item. `Duplicate` when the identifier already exists.
    fn add(&self, id: &str, value: &[u8]) -> StoreStatus;

    /// Replace an existing item. `NotFound` when absent.
    fn replace(&self, id: &str, value: &[u8]) -> StoreStatus;

    fn fetch(&self, id: &str) -> FetchOutcome;

    fn remove(&self, id: &str) -> StoreStatus;
}

// ── OS keyring ───────────────────────────────────────────────────────────────

/// Credential store backed by the OS keyring.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, id: &str) -> Result<Entry, StoreStatus> {
        Entry::new(&self.service, id).map_err(|_| StoreStatus::ParamError)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_keyring_error(err: keyring::Error) -> StoreStatus {
    match err {
        keyring::Error::NoEntry => StoreStatus::NotFound,
        keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
            StoreStatus::AuthFailed
        }
        _ => StoreStatus::ParamError,
    }
}

impl CredentialStore for KeyringStore {
    fn add(&self, id: &str, value: &[u8]) -> StoreStatus {
        let entry = match self.entry(id) {
            Ok(e) => e,
            Err(status) => return status,
        };
        if entry.get_password().is_ok() {
            return StoreStatus::Duplicate;
        }
        let encoded = general_purpose::STANDARD.encode(value);
        match entry.set_password(&encoded) {
            Ok(()) => StoreStatus::Success,
            Err(e) => map_keyring_error(e),
        }
    }

    fn replace(&self, id: &str, value: &[u8]) -> StoreStatus {
        let entry = match self.entry(id) {
            Ok(e) => e,
            Err(status) => return status,
        };
        if entry.get_password().is_err() {
            return StoreStatus::NotFound;
        }
        let encoded = general_purpose::STANDARD.encode(value);
        match entry.set_password(&encoded) {
            Ok(()) => StoreStatus::Success,
            Err(e) => map_keyring_error(e),
        }
    }

    fn fetch(&self, id: &str) -> FetchOutcome {
        let entry = match self.entry(id) {
            Ok(e) => e,
            Err(status) => {
                return FetchOutcome {
                    status,
                    value: None,
                }
            }
        };
        match entry.get_password() {
            Ok(encoded) => match general_purpose::STANDARD.decode(encoded) {
                Ok(value) => FetchOutcome {
                    status: StoreStatus::Success,
                    value: Some(value),
                },
                Err(_) => FetchOutcome {
                    status: StoreStatus::ParamError,
                    value: None,
                },
            },
            Err(e) => FetchOutcome {
                status: map_keyring_error(e),
                value: None,
            },
        }
    }

    fn remove(&self, id: &str) -> StoreStatus {
        let entry = match self.entry(id) {
            Ok(e) => e,
            Err(status) => return status,
        };
        match entry.delete_password() {
            Ok(()) => StoreStatus::Success,
            Err(e) => map_keyring_error(e),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// In-process credential store for tests and headless environments.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw ciphertext view, for tests asserting what actually persists.
    pub fn raw(&self, id: &str) -> Option<Vec<u8>> {
        self.items.read().get(id).cloned()
    }
}

impl CredentialStore for MemoryStore {
    fn add(&self, id: &str, value: &[u8]) -> StoreStatus {
        let mut items = self.items.write();
        if items.contains_key(id) {
            return StoreStatus::Duplicate;
        }
        items.insert(id.to_string(), value.to_vec());
        StoreStatus::Success
    }

    fn replace(&self, id: &str, value: &[u8]) -> StoreStatus {
        let mut items = self.items.write();
        match items.get_mut(id) {
            Some(slot) => {
                *slot = value.to_vec();
                StoreStatus::Success
            }
            None => StoreStatus::NotFound,
        }
    }

    fn fetch(&self, id: &str) -> FetchOutcome {
        match self.items.read().get(id) {
            Some(value) => FetchOutcome {
                status: StoreStatus::Success,
                value: Some(value.clone()),
            },
            None => FetchOutcome {
                status: StoreStatus::NotFound,
                value: None,
            },
        }
    }

    fn remove(&self, id: &str) -> StoreStatus {
        match self.items.write().remove(id) {
            Some(_) => StoreStatus::Success,
            None => StoreStatus::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_add_fetch_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.add("a", b"one"), StoreStatus::Success);
        assert_eq!(store.add("a", b"two"), StoreStatus::Duplicate);
        assert_eq!(store.replace("a", b"two"), StoreStatus::Success);
        let out = store.fetch("a");
        assert_eq!(out.status, StoreStatus::Success);
        assert_eq!(out.value.as_deref(), Some(&b"two"[..]));
        assert_eq!(store.remove("a"), StoreStatus::Success);
        assert_eq!(store.remove("a"), StoreStatus::NotFound);
        assert_eq!(store.fetch("a").status, StoreStatus::NotFound);
    }

    #[test]
    fn replace_requires_existing_item() {
        let store = MemoryStore::new();
        assert_eq!(store.replace("missing", b"x"), StoreStatus::NotFound);
    }
}
