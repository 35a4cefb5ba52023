//! Binding-list file persistence: an ordered JSON collection of records.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::WalletError;
use crate::registry::binding::HskBinding;

pub struct BindingStore {
    path: PathBuf,
}

impl BindingStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the binding list. A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<HskBinding>, WalletError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path)
            .map_err(|e| WalletError::BindingFailed(format!("Read binding list: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| WalletError::BindingFailed(format!("Parse binding list: {e}")))
    }

    pub fn save(&self, bindings: &[HskBinding]) -> Result<(), WalletError> {
        let bytes = serde_json::to_vec_pretty(bindings)
            .map_err(|e| WalletError::BindingFailed(format!("Encode binding list: {e}")))?;
        let mut file = File::create(&self.path)
            .map_err(|e| WalletError::BindingFailed(format!("Write binding list: {e}")))?;
        file.write_all(&bytes)
            .and_then(|_| file.flush())
            .map_err(|e| WalletError::BindingFailed(format!("Write binding list: {e}")))?;
        Ok(())
    }
}
