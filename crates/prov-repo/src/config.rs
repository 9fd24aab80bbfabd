//! TOML description of a repo tree.
//!
//! ```toml
//! [repo]
//! name = "tiers"
//! kind = "chained"
//!
//! [[repo.members]]
//! name = "cache"
//! kind = "memory"
//!
//! [[repo.members]]
//! name = "durable"
//! kind = "database"
//! path = ".prov/journal"
//! read_through_write = false
//! blobstore = { kind = "fs", path = ".prov" }
//! ```
//!
//! Capability flags (`read`, `write`, `delete`, `read_through_write`) may be
//! set on any repo and default to `true`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use prov_store::{BlobStore, FsBlobStore, InMemoryBlobStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chained::{ChainedRepo, PutPolicy};
use crate::database::{DatabaseConfig, DatabaseRepo};
use crate::error::{RepoError, RepoResult};
use crate::journal::SyncMode;
use crate::memory::MemoryRepo;
use crate::permissions::RepoPermissions;
use crate::traits::Repo;

/// Top-level configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvConfig {
    pub repo: RepoConfig,
}

impl ProvConfig {
    /// A database repo at `<root>/journal` with blobs under `<root>/blobs`.
    pub fn local(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            repo: RepoConfig {
                name: "local".into(),
                permissions: RepoPermissions::all(),
                backend: BackendConfig::Database {
                    path: root.join("journal"),
                    sync_mode: SyncMode::default(),
                    blobstore: Some(BlobStoreConfig::Fs {
                        path: root.to_path_buf(),
                    }),
                },
            },
        }
    }

    pub fn load(path: &Path) -> RepoResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| RepoError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> RepoResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RepoError::Config(e.to_string()))?;
        config.repo.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        toml::to_string_pretty(self).map_err(|e| RepoError::Config(e.to_string()))
    }
}

impl Default for ProvConfig {
    fn default() -> Self {
        Self::local(".prov")
    }
}

/// One node of the repo tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default = "default_repo_name")]
    pub name: String,
    #[serde(flatten)]
    pub permissions: RepoPermissions,
    #[serde(flatten)]
    pub backend: BackendConfig,
}

fn default_repo_name() -> String {
    "repo".into()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Memory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blobstore: Option<BlobStoreConfig>,
    },
    Database {
        path: PathBuf,
        #[serde(default)]
        sync_mode: SyncMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blobstore: Option<BlobStoreConfig>,
    },
    Chained {
        #[serde(default)]
        put_policy: PutPolicy,
        #[serde(default)]
        members: Vec<RepoConfig>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    Memory,
    /// Blobs live under `<path>/blobs`.
    Fs { path: PathBuf },
}

impl BlobStoreConfig {
    pub fn build(&self) -> RepoResult<Arc<dyn BlobStore>> {
        Ok(match self {
            Self::Memory => Arc::new(InMemoryBlobStore::new()),
            Self::Fs { path } => Arc::new(FsBlobStore::open(path)?),
        })
    }
}

/// A built repo tree plus handles to its journal-backed nodes, which expose
/// maintenance operations beyond [`Repo`].
pub struct RepoTree {
    pub root: Arc<dyn Repo>,
    pub databases: Vec<Arc<DatabaseRepo>>,
}

impl RepoConfig {
    /// Reject trees that cannot be built.
    pub fn validate(&self) -> RepoResult<()> {
        if self.name.trim().is_empty() {
            return Err(RepoError::Config("repo name must not be empty".into()));
        }
        match &self.backend {
            BackendConfig::Memory { .. } => Ok(()),
            BackendConfig::Database { path, .. } if path.as_os_str().is_empty() => Err(
                RepoError::Config(format!("database repo {:?} needs a path", self.name)),
            ),
            BackendConfig::Database { .. } => Ok(()),
            BackendConfig::Chained { members, .. } => {
                members.iter().try_for_each(RepoConfig::validate)
            }
        }
    }

    pub fn build(&self) -> RepoResult<Arc<dyn Repo>> {
        Ok(self.build_tree()?.root)
    }

    pub fn build_tree(&self) -> RepoResult<RepoTree> {
        let mut databases = Vec::new();
        let root = self.build_into(&mut databases)?;
        Ok(RepoTree { root, databases })
    }

    fn build_into(&self, databases: &mut Vec<Arc<DatabaseRepo>>) -> RepoResult<Arc<dyn Repo>> {
        self.validate()?;
        let repo: Arc<dyn Repo> = match &self.backend {
            BackendConfig::Memory { blobstore } => {
                let mut repo = MemoryRepo::new()
                    .with_name(&self.name)
                    .with_permissions(self.permissions);
                if let Some(blobs) = blobstore {
                    repo = repo.with_blobstore(blobs.build()?);
                }
                Arc::new(repo)
            }
            BackendConfig::Database {
                path,
                sync_mode,
                blobstore,
            } => {
                let config = DatabaseConfig::new(path).sync_mode(*sync_mode);
                let mut repo = DatabaseRepo::open(config)?
                    .with_name(&self.name)
                    .with_permissions(self.permissions);
                if let Some(blobs) = blobstore {
                    repo = repo.with_blobstore(blobs.build()?);
                }
                let repo = Arc::new(repo);
                databases.push(Arc::clone(&repo));
                repo
            }
            BackendConfig::Chained {
                put_policy,
                members,
            } => {
                let members = members
                    .iter()
                    .map(|member| member.build_into(databases))
                    .collect::<RepoResult<Vec<_>>>()?;
                Arc::new(
                    ChainedRepo::new(members)
                        .with_name(&self.name)
                        .with_permissions(self.permissions)
                        .with_put_policy(*put_policy),
                )
            }
        };
        debug!(repo = %self.name, kind = self.kind(), "repo built");
        Ok(repo)
    }

    pub fn kind(&self) -> &'static str {
        match self.backend {
            BackendConfig::Memory { .. } => "memory",
            BackendConfig::Database { .. } => "database",
            BackendConfig::Chained { .. } => "chained",
        }
    }
}
