//! # tagbump-github
//!
//! GitHub Git Data API integration for tagbump: reads refs, commits, trees
//! and blobs, writes new objects and advances refs without a local clone.
//!
//! # Security
//!
//! Authentication tokens are stored using `SecretString` which automatically
//! zeroizes memory when dropped, reducing credential exposure in memory dumps.

mod auth;
mod client;
mod error;
mod store;
mod types;

pub use auth::Auth;
pub use client::GitHubClient;
pub use error::{Error, Result};
// Re-export SecretString for constructing Auth::Token
pub use secrecy::SecretString;
pub use store::GitHubStore;
pub use types::{
    CreateBlob, CreateCommit, CreateTree, CreateTreeEntry, CreatedObject, GitActor, GitBlob,
    GitCommit, GitRef, GitRefObject, GitTree, GitTreeEntry, ShaRef, UpdateRef,
};
