//! Persistent binding record.
//!
//! The serialized form is a hard security boundary: the record carries
//! the one-way credential hash and a salt *reference*, and has no field
//! for the key handle or a raw credential id at all. What is not in the
//! struct cannot end up in the bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hsk::transport::DerivationStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HskBinding {
    pub id: Uuid,
    pub hsk_id: String,
    pub address: String,
    /// Hex of the one-way SHA-256 hash; the raw credential id is
    /// discarded at derivation time.
    pub credential_id_hash: String,
    pub strategy: DerivationStrategy,
    /// Credential-store reference of the 32-byte derivation salt.
    /// Present only for non-legacy strategies.
    pub derivation_salt_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}
