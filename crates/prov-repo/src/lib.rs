//! Artifact repositories for the provenance store.
//!
//! Every backend implements the [`Repo`] trait and gates each operation
//! category behind live [`Permissions`] flags. The permission check always
//! precedes the data lookup.
//!
//! # Backends
//!
//! - [`MemoryRepo`] -- in-process index, optional blob store for payloads
//! - [`DatabaseRepo`] -- in-memory index rebuilt from a CRC-framed journal
//! - [`ChainedRepo`] -- ordered composition with selective read-through-write
//!
//! Repo trees can be described in TOML and built with [`ProvConfig`].

mod backend;
pub mod chained;
pub mod config;
pub mod database;
pub mod error;
mod index;
pub mod journal;
pub mod memory;
pub mod permissions;
pub mod record;
pub mod traits;

pub use chained::{ChainedRepo, PutPolicy};
pub use config::{BackendConfig, BlobStoreConfig, ProvConfig, RepoConfig, RepoTree};
pub use database::{DatabaseConfig, DatabaseRepo};
pub use error::{Capability, RepoError, RepoResult};
pub use journal::{JournalOp, SyncMode};
pub use memory::MemoryRepo;
pub use permissions::{Permissions, RepoPermissions};
pub use record::{ArtifactRecord, Payload};
pub use traits::Repo;
