//! Cache key derived from a canonicalized search

use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Identity of a cached result set
///
/// Equality is defined by the canonical form; the fingerprint is a short,
/// log-friendly digest of it.
#[derive(Debug, Clone)]
pub struct CacheKey {
    canonical: String,
    fingerprint: String,
}

impl CacheKey {
    /// Builds a key from an already-canonical string
    pub fn from_canonical(canonical: impl Into<String>) -> Self {
        let canonical = canonical.into();
        let fingerprint = Self::digest(&canonical);

        Self {
            canonical,
            fingerprint,
        }
    }

    /// Builds a key from a namespace and a serializable canonical value
    ///
    /// Struct fields serialize in declaration order and sets in sorted order,
    /// so equal values always produce equal keys.
    pub fn from_serializable<T: Serialize>(
        namespace: &str,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Self::from_canonical(format!("{}:{}", namespace, json)))
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn digest(input: &str) -> String {
        let hash = Sha256::digest(input.as_bytes());
        hex::encode(&hash[..8])
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fingerprint)
    }
}
