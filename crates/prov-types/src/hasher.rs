use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::canonical::canonical_bytes;
use crate::id::ContentId;
use crate::inputs::Inputs;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"prov-artifact-v1"`) that is
/// prepended to every hash computation. An artifact id and a value id computed
/// over identical bytes therefore never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for artifact ids (function identity + inputs).
    pub const ARTIFACT: Self = Self {
        domain: "prov-artifact-v1",
    };
    /// Hasher for value ids (materialized values).
    pub const VALUE: Self = Self {
        domain: "prov-value-v1",
    };
    /// Hasher for artifact set ids.
    pub const SET: Self = Self {
        domain: "prov-set-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentId {
        blake3_digest(self.domain, data)
    }

    /// Hash a JSON value in its canonical encoding.
    pub fn hash_json(&self, value: &Value) -> ContentId {
        self.hash(&canonical_bytes(value))
    }

    /// Verify that data produces the expected id.
    pub fn verify(&self, data: &[u8], expected: &ContentId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

fn blake3_digest(domain: &str, data: &[u8]) -> ContentId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(b":");
    hasher.update(data);
    ContentId::from_hash(*hasher.finalize().as_bytes())
}

/// Pluggable identifier derivation.
///
/// Implementors supply [`digest`](IdHasher::digest); the provided methods fix
/// *what* is hashed for each identifier kind so that every hasher agrees on
/// the hash input and differs only in the digest function.
pub trait IdHasher: Send + Sync {
    /// Digest `data` under `domain`.
    fn digest(&self, domain: &str, data: &[u8]) -> ContentId;

    /// Identifier of "how a value was produced": function name, version,
    /// and the provenance inputs structure.
    fn artifact_id(&self, name: &str, version: u32, inputs: &Inputs) -> ContentId {
        let record = json!({
            "name": name,
            "version": version,
            "inputs": inputs.to_json(),
        });
        self.digest(ContentHasher::ARTIFACT.domain(), &canonical_bytes(&record))
    }

    /// Identifier of a materialized value alone.
    fn value_id(&self, value: &Value) -> ContentId {
        self.digest(ContentHasher::VALUE.domain(), &canonical_bytes(value))
    }

    /// Identifier of an artifact set: its sorted member ids plus optional name.
    fn set_id(&self, artifact_ids: &BTreeSet<ContentId>, name: Option<&str>) -> ContentId {
        let ids: Vec<&str> = artifact_ids.iter().map(ContentId::as_str).collect();
        let record = json!({ "artifact_ids": ids, "name": name });
        self.digest(ContentHasher::SET.domain(), &canonical_bytes(&record))
    }
}

/// The default [`IdHasher`]: domain-separated BLAKE3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl IdHasher for Blake3Hasher {
    fn digest(&self, domain: &str, data: &[u8]) -> ContentId {
        blake3_digest(domain, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::Input;

    #[test]
    fn hash_is_deterministic() {
        let id1 = ContentHasher::VALUE.hash(b"hello world");
        let id2 = ContentHasher::VALUE.hash(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let artifact = ContentHasher::ARTIFACT.hash(data);
        let value = ContentHasher::VALUE.hash(data);
        let set = ContentHasher::SET.hash(data);
        assert_ne!(artifact, value);
        assert_ne!(artifact, set);
        assert_ne!(value, set);
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::VALUE.hash(b"original");
        assert!(ContentHasher::VALUE.verify(b"original", &id));
        assert!(!ContentHasher::VALUE.verify(b"tampered", &id));
    }

    #[test]
    fn hash_json_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": [1, 2]}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": [1, 2], "x": 1}"#).unwrap();
        assert_eq!(ContentHasher::VALUE.hash_json(&a), ContentHasher::VALUE.hash_json(&b));
    }

    #[test]
    fn blake3_hasher_matches_content_hasher() {
        let value = json!({"data": [1, 2, 3]});
        assert_eq!(Blake3Hasher.value_id(&value), ContentHasher::VALUE.hash_json(&value));
    }

    #[test]
    fn artifact_id_depends_on_version() {
        let mut inputs = Inputs::new();
        inputs.insert("x", Input::from(1)).unwrap();
        let v0 = Blake3Hasher.artifact_id("f", 0, &inputs);
        let v1 = Blake3Hasher.artifact_id("f", 1, &inputs);
        assert_ne!(v0, v1);
    }

    #[test]
    fn set_id_depends_on_name() {
        let ids: BTreeSet<ContentId> = ["a", "b"].into_iter().map(ContentId::from).collect();
        assert_ne!(Blake3Hasher.set_id(&ids, None), Blake3Hasher.set_id(&ids, Some("s")));
    }

    #[test]
    fn custom_digest_is_used_by_provided_methods() {
        struct Fixed;
        impl IdHasher for Fixed {
            fn digest(&self, domain: &str, _data: &[u8]) -> ContentId {
                ContentId::new(format!("fixed-{domain}"))
            }
        }
        assert_eq!(Fixed.value_id(&json!(1)).as_str(), "fixed-prov-value-v1");
    }
}
