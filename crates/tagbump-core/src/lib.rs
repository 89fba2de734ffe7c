//! # tagbump-core
//!
//! Core library for tagbump: a conflict-safe "GitOps promotion" that rewrites
//! one field of a YAML manifest stored in a remote git repository, commits the
//! change and advances a branch with compare-and-swap semantics.
//!
//! The crate is backend agnostic. Remote object databases plug in through the
//! [`ObjectStore`] trait and container registries through [`RegistryChecker`].

pub mod config;
pub mod error;
pub mod field_path;
pub mod object;
pub mod registry;
pub mod resolve;
pub mod retry;
pub mod store;
pub mod transaction;
pub mod yaml;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_mocks;

pub use config::Config;
pub use error::{Error, Result};
pub use field_path::FieldPath;
pub use object::{
    Commit, FileMode, GitObjectRef, NewCommit, ObjectId, ObjectKind, Signature, Tree, TreeEntry,
    TreeUpdate,
};
pub use registry::{
    ImageReference, NoRegistry, RegistryChecker, RegistryError, RegistryStatus, TagLookup,
};
pub use resolve::{ResolvedBlob, resolve_path};
pub use retry::RetryPolicy;
pub use store::{ObjectStore, StoreError, StoreResult};
pub use transaction::{
    CommitIdentity, PromotionOutcome, PromotionRequest, PromotionStatus, TransactionRunner,
};
pub use yaml::{DocumentSet, PatchOutcome};
