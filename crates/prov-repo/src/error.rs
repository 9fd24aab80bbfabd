use std::fmt;

use prov_store::BlobError;
use prov_types::{ContentId, TypeError};
use serde::{Deserialize, Serialize};

/// An operation category gated by a repo's permission flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Delete,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// An artifact with this id is already stored. Artifacts are immutable.
    #[error("artifact already exists: {0}")]
    KeyExists(ContentId),

    /// An artifact set with this id is already stored.
    #[error("artifact set already exists: {0}")]
    SetExists(ContentId),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(ContentId),

    #[error("no artifact with value id: {0}")]
    ValueNotFound(ContentId),

    #[error("artifact set not found: {0}")]
    SetNotFound(ContentId),

    #[error("no artifact set named {0:?}")]
    SetNameNotFound(String),

    /// The repo's flag for this operation category is off.
    #[error("repo {repo:?} does not permit {capability}")]
    PermissionDenied { repo: String, capability: Capability },

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    /// The journal file is unusable (not merely torn at the tail).
    #[error("journal error: {0}")]
    Journal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl RepoError {
    pub fn permission_denied(repo: &str, capability: Capability) -> Self {
        Self::PermissionDenied {
            repo: repo.to_string(),
            capability,
        }
    }

    /// Any of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound(_)
                | Self::ValueNotFound(_)
                | Self::SetNotFound(_)
                | Self::SetNameNotFound(_)
        )
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// A duplicate artifact or set put.
    pub fn is_key_exists(&self) -> bool {
        matches!(self, Self::KeyExists(_) | Self::SetExists(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for RepoError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned(e.to_string())
    }
}

impl From<TypeError> for RepoError {
    fn from(e: TypeError) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
