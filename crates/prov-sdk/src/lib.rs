//! Call-and-memoize facade over a provenance repo.
//!
//! [`Provenance::call`] binds a call against a [`FunctionSignature`],
//! derives the artifact id from the function's name, version, and inputs,
//! and either returns the stored artifact or runs the computation and stores
//! the result. Artifacts passed as arguments are recorded by reference and
//! resolved to their values before the computation runs.
//!
//! ```
//! use std::sync::Arc;
//! use prov_repo::MemoryRepo;
//! use prov_sdk::{CallArgs, FunctionSignature, Provenance};
//! use serde_json::json;
//!
//! let prov = Provenance::new(Arc::new(MemoryRepo::new()));
//! let double = FunctionSignature::new("double").param("x");
//! let a = prov
//!     .call(&double, CallArgs::new().arg(21), |args| Ok(json!(args.i64("x")? * 2)))
//!     .unwrap();
//! assert_eq!(a.value, json!(42));
//! ```

pub mod call;
pub mod error;
pub mod provenance;

pub use call::{BoundArgs, CallArgs};
pub use error::{SdkError, SdkResult};
pub use provenance::Provenance;

// Re-export key types
pub use prov_repo::{Repo, RepoError};
pub use prov_types::{Artifact, ArtifactSet, ContentId, FunctionSignature, Inputs};
