use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid recovery phrase")]
    InvalidPhrase,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Derived key failed the entropy sanity check")]
    DegenerateKey,

    #[error("Unsupported derivation path: {0}")]
    UnsupportedPath(String),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
