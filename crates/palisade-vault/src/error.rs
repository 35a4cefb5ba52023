use thiserror::Error;

/// Vault failure taxonomy. Raw engine codes are carried as data in
/// `UnderlyingStore` and must be translated before reaching any
/// user-facing surface.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Item not found")]
    ItemNotFound,

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Authentication prompt timed out")]
    Timeout,

    #[error("Hardware keystore unavailable")]
    HardwareUnavailable,

    #[error("Credential store failure (status {0})")]
    UnderlyingStore(i32),

    #[error("Envelope format error: {0}")]
    Envelope(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] palisade_crypto::CryptoError),
}
