//! EIP-1559 (type-2) transaction signing.
//!
//! Payload: `0x02 || rlp([chain_id, nonce, max_priority_fee, max_fee,
//! gas_limit, to, value, data, access_list])`; the signing hash is
//! Keccak-256 of that payload, signed with a recoverable secp256k1
//! signature. The raw broadcast form appends `[y_parity, r, s]`.

use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use alloy_primitives::U256;
use palisade_crypto::address::is_evm_address;
use palisade_crypto::{Chain, DerivedKeyMaterial};

use crate::error::WalletError;
use crate::tx::rlp;
use crate::tx::types::{SignedTransaction, Transaction};

fn unsigned_fields(tx: &Transaction) -> Result<Vec<Vec<u8>>, WalletError> {
    if !is_evm_address(&tx.to) {
        return Err(WalletError::InvalidAddress(tx.to.clone()));
    }
    let to_bytes = hex::decode(&tx.to[2..])
        .map_err(|_| WalletError::InvalidAddress(tx.to.clone()))?;

    Ok(vec![
        rlp::encode_u64(tx.chain_id),
        rlp::encode_u64(tx.nonce),
        rlp::encode_u256(tx.max_priority_fee_per_gas),
        rlp::encode_u256(tx.max_fee_per_gas),
        rlp::encode_u64(tx.gas_limit),
        rlp::encode_bytes(&to_bytes),
        rlp::encode_u256(tx.value),
        rlp::encode_bytes(&tx.data),
        rlp::encode_list(&[]),
    ])
}

/// Keccak-256 of the unsigned type-2 payload. Doubles as the identity of
/// a transaction for the simulate-before-sign gate — any field change,
/// nonce included, produces a different hash.
pub fn signing_hash(tx: &Transaction) -> Result<[u8; 32], WalletError> {
    let fields = unsigned_fields(tx)?;
    let mut payload = vec![0x02];
    payload.extend_from_slice(&rlp::encode_list(&fields));
    Ok(Keccak256::digest(&payload).into())
}

/// Sign a validated transaction with chain-correct key material.
pub fn sign_eip1559(
    tx: &Transaction,
    key: &DerivedKeyMaterial,
) -> Result<SignedTransaction, WalletError> {
    if key.chain != Chain::Ethereum {
        return Err(WalletError::InvalidCredential(
            "Signing key is not an Ethereum key".into(),
        ));
    }
    if !key.address.eq_ignore_ascii_case(&tx.from) {
        return Err(WalletError::InvalidCredential(
            "Signing key does not match the sender".into(),
        ));
    }

    let hash = signing_hash(tx)?;
    let signing_key = SigningKey::from_bytes(key.private_key().into())
        .map_err(|_| WalletError::InvalidCredential("Malformed signing key".into()))?;
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(&hash)
        .map_err(|_| WalletError::VerificationFailed("Transaction signing failed".into()))?;

    let sig_bytes = signature.to_bytes();
    let y_parity = recovery_id.to_byte() as u64;

    let mut fields = unsigned_fields(tx)?;
    fields.push(rlp::encode_u64(y_parity));
    fields.push(rlp::encode_u256(U256::from_be_slice(&sig_bytes[..32])));
    fields.push(rlp::encode_u256(U256::from_be_slice(&sig_bytes[32..])));

    let mut raw = vec![0x02];
    raw.extend_from_slice(&rlp::encode_list(&fields));
    let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw)));

    let mut signature_out = Vec::with_capacity(65);
    signature_out.extend_from_slice(&sig_bytes);
    signature_out.push(y_parity as u8);

    Ok(SignedTransaction {
        raw,
        signature: signature_out,
        tx_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::ecdsa::Signature;
    use palisade_crypto::hd;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn eth_key() -> DerivedKeyMaterial {
        hd::derive_key_material(PHRASE, Chain::Ethereum, 0).unwrap()
    }

    fn transfer(from: &str) -> Transaction {
        Transaction {
            from: from.into(),
            to: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
            value: U256::from(1_000_000_000_000_000_000u128),
            data: vec![],
            nonce: 3,
            gas_limit: 21_000,
            max_fee_per_gas: U256::from(40_000_000_000u64),
            max_priority_fee_per_gas: U256::from(2_000_000_000u64),
            chain_id: 1,
        }
    }

    #[test]
    fn signed_envelope_is_well_formed() {
        let key = eth_key();
        let signed = sign_eip1559(&transfer(&key.address), &key).unwrap();
        assert_eq!(signed.raw[0], 0x02);
        assert_eq!(signed.signature.len(), 65);
        assert_eq!(signed.tx_hash.len(), 66);
        assert!(signed.tx_hash.starts_with("0x"));
    }

    #[test]
    fn signature_verifies_against_the_signing_hash() {
        let key = eth_key();
        let tx = transfer(&key.address);
        let signed = sign_eip1559(&tx, &key).unwrap();
        let hash = signing_hash(&tx).unwrap();

        let signing_key = SigningKey::from_bytes(key.private_key().into()).unwrap();
        let signature = Signature::from_slice(&signed.signature[..64]).unwrap();
        signing_key
            .verifying_key()
            .verify_prehash(&hash, &signature)
            .unwrap();
    }

    #[test]
    fn signing_is_deterministic() {
        let key = eth_key();
        let tx = transfer(&key.address);
        let a = sign_eip1559(&tx, &key).unwrap();
        let b = sign_eip1559(&tx, &key).unwrap();
        assert_eq!(a.raw, b.raw);
        assert_eq!(a.tx_hash, b.tx_hash);
    }

    #[test]
    fn nonce_changes_the_signing_hash() {
        let key = eth_key();
        let tx = transfer(&key.address);
        let a = signing_hash(&tx).unwrap();
        let b = signing_hash(&tx.with_nonce(4)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn mismatched_sender_is_rejected() {
        let key = eth_key();
        let tx = transfer("0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
        assert!(matches!(
            sign_eip1559(&tx, &key),
            Err(WalletError::InvalidCredential(_))
        ));
    }

    #[test]
    fn non_ethereum_key_is_rejected() {
        let key = hd::derive_key_material(PHRASE, Chain::Solana, 0).unwrap();
        let tx = transfer(&key.address);
        assert!(matches!(
            sign_eip1559(&tx, &key),
            Err(WalletError::InvalidCredential(_))
        ));
    }

    #[test]
    fn malformed_recipient_is_rejected() {
        let key = eth_key();
        let mut tx = transfer(&key.address);
        tx.to = "0xnot-an-address".into();
        assert!(matches!(
            sign_eip1559(&tx, &key),
            Err(WalletError::InvalidAddress(_))
        ));
    }
}
