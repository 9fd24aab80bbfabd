//! Foundation types for the provenance repository.
//!
//! This crate provides the data model shared by every other `prov` crate:
//! content identifiers, artifacts, artifact sets, and the provenance inputs
//! structure that records how each artifact was produced.
//!
//! # Key Types
//!
//! - [`ContentId`] -- hash-derived identifier of a computation, value, or set
//! - [`Artifact`] -- immutable value record plus its provenance
//! - [`ArtifactProxy`] -- by-reference stand-in used inside inputs
//! - [`ArtifactSet`] -- named or anonymous grouping of artifact ids
//! - [`Inputs`] -- ordered bound arguments; [`Inputs::to_json`] is the
//!   provenance serializer
//! - [`FunctionSignature`] -- declared parameters used to bind call arguments
//! - [`IdHasher`] -- pluggable identifier derivation ([`Blake3Hasher`] default)

pub mod artifact;
pub mod canonical;
pub mod error;
pub mod hasher;
pub mod id;
pub mod inputs;
pub mod set;
pub mod signature;

pub use artifact::{Artifact, ArtifactBuilder};
pub use canonical::{canonical_bytes, canonical_json};
pub use error::TypeError;
pub use hasher::{Blake3Hasher, ContentHasher, IdHasher};
pub use id::ContentId;
pub use inputs::{
    datetime_literal, inputs_json, ArtifactProxy, Input, Inputs, PROXY_TYPE, VARARGS_KEY,
};
pub use set::ArtifactSet;
pub use signature::{FunctionSignature, Param};
