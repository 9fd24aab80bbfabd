//! Content-addressed blob storage for the provenance repository.
//!
//! Repositories that delegate value storage write artifact values and
//! serialized inputs here, keyed by the artifact's `value_id` and `id`. The
//! store is a pure key-value store: keys are computed by the caller and the
//! bytes are never interpreted.
//!
//! # Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- sharded directory tree with atomic writes

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{BlobError, BlobResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
