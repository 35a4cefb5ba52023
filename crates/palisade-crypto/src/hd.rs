//! Hierarchical multi-chain key derivation from a BIP-39 recovery phrase.
//!
//! Paths (account-level hardening):
//! - Ethereum: BIP-44  `m/44'/60'/account'/0/0`  (secp256k1, BIP-32)
//! - Bitcoin:  BIP-84  `m/84'/0'/account'/0/0`   (secp256k1, BIP-32)
//! - Solana:   SLIP-10 `m/44'/501'/account'/0'`  (ed25519, fully hardened)
//!
//! Malformed phrases are rejected up front: BIP-39 word-list and checksum
//! validation runs before any key math, so a typo'd phrase can never
//! silently derive a mathematically valid but meaningless key.

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

use crate::address;
use crate::error::CryptoError;
use crate::keys::{Chain, DerivedKeyMaterial};

type HmacSha512 = Hmac<Sha512>;

/// Standard derivation paths per chain.
pub mod paths {
    use crate::keys::Chain;

    pub fn ethereum(account: u32) -> String {
        format!("m/44'/60'/{account}'/0/0")
    }

    pub fn bitcoin(account: u32) -> String {
        format!("m/84'/0'/{account}'/0/0")
    }

    pub fn solana(account: u32) -> String {
        format!("m/44'/501'/{account}'/0'")
    }

    pub fn for_chain(chain: Chain, account: u32) -> String {
        match chain {
            Chain::Ethereum => ethereum(account),
            Chain::Bitcoin => bitcoin(account),
            Chain::Solana => solana(account),
        }
    }
}

/// Generate a fresh BIP-39 phrase. Valid word counts: 12, 15, 18, 21, 24.
pub fn generate_phrase(word_count: usize) -> Result<String, CryptoError> {
    match word_count {
        12 | 15 | 18 | 21 | 24 => {}
        _ => {
            return Err(CryptoError::InvalidKey(format!(
                "Unsupported word count {word_count}; use 12, 15, 18, 21 or 24"
            )))
        }
    }
    let mnemonic = Mnemonic::generate_in(Language::English, word_count)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Word-list + checksum validation, no derivation.
pub fn validate_phrase(phrase: &str) -> Result<(), CryptoError> {
    parse_phrase(phrase).map(|_| ())
}

fn parse_phrase(phrase: &str) -> Result<Mnemonic, CryptoError> {
    Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|_| CryptoError::InvalidPhrase)
}

/// Derive the 32-byte private key for `chain` at the given account index.
///
/// Deterministic: same phrase + chain + account always yields the same key.
pub fn derive_private_key(
    phrase: &str,
    chain: Chain,
    account: u32,
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mnemonic = parse_phrase(phrase)?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));
    match chain {
        Chain::Ethereum | Chain::Bitcoin => {
            let path: DerivationPath = paths::for_chain(chain, account)
                .parse()
                .map_err(|_| CryptoError::UnsupportedPath(paths::for_chain(chain, account)))?;
            let xprv = XPrv::derive_from_path(&seed[..], &path)
                .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
            Ok(Zeroizing::new(xprv.private_key().to_bytes().into()))
        }
        Chain::Solana => {
            // SLIP-10 allows only hardened steps on the ed25519 curve.
            let indices = [44, 501, account, 0];
            Ok(slip10_ed25519(&seed[..], &indices))
        }
    }
}

/// Derive key + chain-correct address in one step.
pub fn derive_key_material(
    phrase: &str,
    chain: Chain,
    account: u32,
) -> Result<DerivedKeyMaterial, CryptoError> {
    let key = derive_private_key(phrase, chain, account)?;
    let addr = address::for_chain(&key, chain)?;
    Ok(DerivedKeyMaterial::new(*key, chain, addr))
}

/// SLIP-10 ed25519 derivation. Every index is hardened.
fn slip10_ed25519(seed: &[u8], indices: &[u32]) -> Zeroizing<[u8; 32]> {
    let mut mac =
        HmacSha512::new_from_slice(b"ed25519 seed").expect("HMAC accepts any key length");
    mac.update(seed);
    let mut il_ir = [0u8; 64];
    il_ir.copy_from_slice(&mac.finalize().into_bytes());

    for index in indices {
        let mut child =
            HmacSha512::new_from_slice(&il_ir[32..]).expect("HMAC accepts any key length");
        child.update(&[0u8]);
        child.update(&il_ir[..32]);
        child.update(&(index | 0x8000_0000).to_be_bytes());
        let mut next = [0u8; 64];
        next.copy_from_slice(&child.finalize().into_bytes());
        il_ir.zeroize();
        il_ir = next;
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&il_ir[..32]);
    il_ir.zeroize();
    Zeroizing::new(key)
}
