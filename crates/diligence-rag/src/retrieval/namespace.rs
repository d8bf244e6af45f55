//! Tenant/project scoped collection identifiers

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex chars of the digest kept in the identifier
const HASH_CHARS: usize = 24;

/// Deterministic, bounded-length collection id for a (tenant, project) pair.
///
/// `ns_` + the first 24 hex chars of SHA-256 over
/// `"{tenant_len}:{tenant}/{project}"`. The length prefix keeps pairs whose
/// ids contain `/` apart. Truncation to 96 bits leaves a small collision probability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    pub fn for_project(tenant_id: &str, project_id: &str) -> Self {
        let digest = Sha256::digest(format!("{}:{}/{}", tenant_id.len(), tenant_id, project_id).as_bytes());
        let mut hash = hex::encode(digest);
        hash.truncate(HASH_CHARS);
        Self(format!("ns_{}", hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_and_bounded() {
        let a = Namespace::for_project("acme", "deal-42");
        let b = Namespace::for_project("acme", "deal-42");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 27);
        assert!(a.as_str().starts_with("ns_"));
        assert!(a.as_str()[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_pairs_differ() {
        let a = Namespace::for_project("acme", "deal-42");
        assert_ne!(a, Namespace::for_project("acme", "deal-43"));
        assert_ne!(a, Namespace::for_project("acme2", "deal-42"));
    }

    #[test]
    fn test_separator_in_ids_does_not_collide() {
        assert_ne!(
            Namespace::for_project("acme/deal", "1"),
            Namespace::for_project("acme", "deal/1")
        );
        assert_ne!(Namespace::for_project("a/b", "c"), Namespace::for_project("a", "b/c"));
        assert_ne!(Namespace::for_project("", "a/b"), Namespace::for_project("a", "b"));
    }
}
