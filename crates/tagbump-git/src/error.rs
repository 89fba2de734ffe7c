//! Error types for tagbump-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during local git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository: {0}")]
    NotARepository(String),

    /// A tree path with an empty component.
    #[error("invalid tree path: {0:?}")]
    InvalidPath(String),

    /// Object id that the core object model rejects.
    #[error("invalid object: {0}")]
    InvalidObject(#[from] tagbump_core::Error),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}
