//! Key newtypes
//!
//! Every secret that crosses a module boundary is wrapped so that:
//! - dropping it zeroizes the bytes,
//! - `Debug` never prints the bytes,
//! - none of the wrappers implement `Serialize`.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Chains the wallet derives keys for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Ethereum,
    Bitcoin,
    Solana,
}

impl Chain {
    /// SLIP-44 coin type.
    pub fn coin_type(&self) -> u32 {
        match self {
            Chain::Ethereum => 60,
            Chain::Bitcoin => 0,
            Chain::Solana => 501,
        }
    }
}

/// 32-byte wallet-binding key handle produced by HSK derivation.
///
/// Lives only inside the hardware-backed vault once a binding completes.
/// Deliberately NOT `Serialize`.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct KeyHandle([u8; 32]);

impl KeyHandle {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Entropy sanity check: an all-zero handle means derivation went
    /// through a degenerate input and must never be stored.
    pub fn is_all_zero(&self) -> bool {
        let mut acc = 0u8;
        for b in self.0.iter() {
            acc |= b;
        }
        acc == 0
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyHandle(<redacted>)")
    }
}

impl TryFrom<&[u8]> for KeyHandle {
    type Error = crate::CryptoError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 32] = value.try_into().map_err(|_| {
            crate::CryptoError::InvalidKey(format!(
                "Key handle must be 32 bytes, got {}",
                value.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Chain-specific signing key plus its address.
///
/// Created on demand from a recovery phrase, destroyed at the end of the
/// signing scope. The private key is zeroized on drop; chain and address
/// are not secret.
#[derive(ZeroizeOnDrop)]
pub struct DerivedKeyMaterial {
    private_key: [u8; 32],
    #[zeroize(skip)]
    pub chain: Chain,
    #[zeroize(skip)]
    pub address: String,
}

impl DerivedKeyMaterial {
    pub fn new(private_key: [u8; 32], chain: Chain, address: String) -> Self {
        Self {
            private_key,
            chain,
            address,
        }
    }

    pub fn private_key(&self) -> &[u8; 32] {
        &self.private_key
    }

    /// Consume and zeroize explicitly (drop does the same; this makes the
    /// end of a signing scope visible at the call site).
    pub fn wipe(mut self) {
        self.private_key.zeroize();
    }
}

impl std::fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyMaterial")
            .field("chain", &self.chain)
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
