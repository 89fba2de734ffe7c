//! # tagbump-git
//!
//! Local object store for tagbump, built on git2-rs.
//! Promotions run directly against a repository on disk: objects are
//! written to its object database and refs move with libgit2's
//! compare-and-swap reference update.

mod error;
mod repository;
mod store;

pub use error::{Error, Result};
pub use git2::Oid;
pub use repository::Repository;
