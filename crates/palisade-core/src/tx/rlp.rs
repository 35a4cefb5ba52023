//! Minimal RLP encoder — just what a type-2 transaction payload needs.
//!
//! Integers are encoded big-endian with leading zeros stripped; zero is
//! the empty string. Short strings (< 56 bytes) get a one-byte header,
//! longer ones a length-of-length header. Same scheme for lists.

use alloy_primitives::U256;

pub fn encode_bytes(payload: &[u8]) -> Vec<u8> {
    if payload.len() == 1 && payload[0] < 0x80 {
        return payload.to_vec();
    }
    let mut out = header(0x80, 0xb7, payload.len());
    out.extend_from_slice(payload);
    out
}

pub fn encode_u64(value: u64) -> Vec<u8> {
    encode_bytes(&trim_leading_zeros(&value.to_be_bytes()))
}

pub fn encode_u256(value: U256) -> Vec<u8> {
    encode_bytes(&trim_leading_zeros(&value.to_be_bytes::<32>()))
}

/// Wrap already-encoded items into a list.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let body_len: usize = items.iter().map(Vec::len).sum();
    let mut out = header(0xc0, 0xf7, body_len);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

fn header(short_base: u8, long_base: u8, len: usize) -> Vec<u8> {
    if len <= 55 {
        vec![short_base + len as u8]
    } else {
        let len_bytes = trim_leading_zeros(&(len as u64).to_be_bytes());
        let mut out = vec![long_base + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    match bytes.iter().position(|b| *b != 0) {
        Some(first) => bytes[first..].to_vec(),
        None => Vec::new(),
    }
}
