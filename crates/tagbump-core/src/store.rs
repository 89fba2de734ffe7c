//! Trait abstraction over a git object database.
//!
//! This module defines the `ObjectStore` trait which abstracts the handful of
//! object and ref operations a promotion needs, allowing for:
//! - A remote backend (GitHub Git Data API)
//! - A local backend (libgit2)
//! - In-memory mocks for testing

use std::future::Future;

use crate::object::{Commit, NewCommit, ObjectId, ObjectKind, Tree, TreeUpdate};

/// Errors reported by an [`ObjectStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The ref does not exist.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// No object with this id exists.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// The object exists but has a different kind.
    #[error("object {id} is a {actual}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// A conditional ref update found a different current value.
    #[error("reference {ref_name} no longer points at {expected}")]
    RefConflict { ref_name: String, expected: ObjectId },

    /// Transport, authentication or decoding failure inside the backend.
    #[error("{0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend-specific error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait for git object database operations.
///
/// Methods are async because the production backend talks HTTP; callers
/// await each call in sequence.
pub trait ObjectStore {
    /// Read the commit id a ref currently points at.
    fn read_ref(&self, name: &str) -> impl Future<Output = StoreResult<ObjectId>> + Send;

    /// Load a commit object.
    fn load_commit(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Commit>> + Send;

    /// Load a tree object.
    fn load_tree(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Tree>> + Send;

    /// Load the raw bytes of a blob.
    fn load_blob(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Vec<u8>>> + Send;

    /// Write a blob and return its id.
    fn save_blob(&self, content: &[u8]) -> impl Future<Output = StoreResult<ObjectId>> + Send;

    /// Write a tree equal to `base` except for `updates`, sharing every
    /// untouched entry, and return its id.
    fn create_tree(
        &self,
        base: &ObjectId,
        updates: &[TreeUpdate],
    ) -> impl Future<Output = StoreResult<ObjectId>> + Send;

    /// Write a commit and return its id.
    fn save_commit(&self, commit: &NewCommit)
    -> impl Future<Output = StoreResult<ObjectId>> + Send;

    /// Move `name` from `expected` to `new`.
    ///
    /// Must fail with [`StoreError::RefConflict`] instead of overwriting when
    /// the ref no longer points at `expected`.
    fn update_ref(
        &self,
        name: &str,
        expected: &ObjectId,
        new: &ObjectId,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}
