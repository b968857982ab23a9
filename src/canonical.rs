//! Canonical serialization for deterministic hashing.
//!
//! Subtree fingerprints and configuration hashes are computed from the
//! canonical JSON encoding of a value.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable Vec order: vectors serialize in index order
//! - No HashMap in hashed data: use BTreeMap or sort first

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::error::{TreeError, TreeResult};

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> TreeResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| TreeError::Serialization(e.to_string()))
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> TreeResult<u64> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, 0))
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> TreeResult<String> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}
