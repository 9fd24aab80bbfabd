use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Content identifier for artifacts, values, and artifact sets.
///
/// A `ContentId` is the lowercase hex digest produced by an
/// [`IdHasher`](crate::IdHasher). Repositories treat it as an opaque key:
/// any hasher may be plugged in, so the only requirement is that the same
/// content always yields the same string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Hex-encode a pre-computed 32-byte digest.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hex::encode(hash))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 8 characters) for logs and listings.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Returns `true` if the identifier is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume and return the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ContentId> for ContentId {
    fn from(id: &ContentId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
