//! Chain-correct address formatting.
//!
//! - Ethereum: Keccak-256 of the uncompressed secp256k1 public key,
//!   last 20 bytes, EIP-55 mixed-case checksum.
//! - Bitcoin: P2PKH base58check (version 0x00) over HASH160 of the
//!   compressed public key.
//! - Solana: base58 of the ed25519 public key.

use k256::ecdsa::SigningKey as Secp256k1SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::CryptoError;
use crate::keys::Chain;

/// Format the address for `chain` from a 32-byte private key.
pub fn for_chain(private_key: &[u8; 32], chain: Chain) -> Result<String, CryptoError> {
    match chain {
        Chain::Ethereum => ethereum(private_key),
        Chain::Bitcoin => bitcoin_p2pkh(private_key),
        Chain::Solana => solana(private_key),
    }
}

/// EIP-55 checksummed `0x…` address.
pub fn ethereum(private_key: &[u8; 32]) -> Result<String, CryptoError> {
    let signing_key = Secp256k1SigningKey::from_bytes(private_key.into())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let point = signing_key.verifying_key().to_encoded_point(false);
    // Skip the 0x04 SEC1 tag; hash the raw 64-byte point.
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    Ok(to_eip55(&addr))
}

/// Apply the EIP-55 mixed-case checksum to a raw 20-byte address.
pub fn to_eip55(addr: &[u8; 20]) -> String {
    let lower = hex::encode(addr);
    let digest = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (digest[i / 2] >> (4 * (1 - i % 2))) & 0x0F;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Legacy P2PKH address (base58check, version 0x00).
pub fn bitcoin_p2pkh(private_key: &[u8; 32]) -> Result<String, CryptoError> {
    let signing_key = Secp256k1SigningKey::from_bytes(private_key.into())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let compressed = signing_key.verifying_key().to_encoded_point(true);

    let h160 = Ripemd160::digest(Sha256::digest(compressed.as_bytes()));
    let mut payload = Vec::with_capacity(25);
    payload.push(0x00);
    payload.extend_from_slice(&h160);

    // base58check: append first 4 bytes of double SHA-256
    let checksum = Sha256::digest(Sha256::digest(&payload));
    payload.extend_from_slice(&checksum[..4]);
    Ok(bs58::encode(payload).into_string())
}

/// Solana address: base58 of the ed25519 public key.
pub fn solana(private_key: &[u8; 32]) -> Result<String, CryptoError> {
    let signing_key = ed25519_dalek::SigningKey::from_bytes(private_key);
    Ok(bs58::encode(signing_key.verifying_key().to_bytes()).into_string())
}

/// Canonical EVM address shape: `0x` + 40 hex characters.
pub fn is_evm_address(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_one() -> [u8; 32] {
        let mut k = [0u8; 32];
        k[31] = 1;
        k
    }

    #[test]
    fn eip55_reference_vectors() {
        // Vectors from the EIP-55 specification.
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let mut raw = [0u8; 20];
            hex::decode_to_slice(expected[2..].to_lowercase(), &mut raw).unwrap();
            assert_eq!(to_eip55(&raw), expected);
        }
    }

    #[test]
    fn ethereum_address_of_key_one() {
        // Address of private key 0x…01 — standard secp256k1 sanity vector.
        assert_eq!(
            ethereum(&key_one()).unwrap(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn bitcoin_address_of_key_one() {
        // P2PKH address of the compressed generator point.
        assert_eq!(
            bitcoin_p2pkh(&key_one()).unwrap(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
    }

    #[test]
    fn solana_address_round_trips_through_base58() {
        let addr = solana(&key_one()).unwrap();
        let decoded = bs58::decode(&addr).into_vec().unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn evm_address_shape() {
        assert!(is_evm_address("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
        assert!(!is_evm_address("0x7E5F"));
        assert!(!is_evm_address("7E5F4552091A69125d5DfCb7b8C2659029395Bdf00"));
        assert!(!is_evm_address("0xZZ5F4552091A69125d5DfCb7b8C2659029395Bdf"));
    }
}
