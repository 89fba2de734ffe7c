//! GitHub Git Data API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagbump_core::{ObjectId, ObjectKind};

/// A git reference (`GET /git/ref/{ref}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    /// Fully-qualified ref name.
    #[serde(rename = "ref")]
    pub ref_name: String,

    /// The object the ref points at.
    pub object: GitRefObject,
}

/// Target of a git reference.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRefObject {
    pub sha: ObjectId,

    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

/// A `{ "sha": ... }` pointer as used for commit trees and parents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaRef {
    pub sha: ObjectId,
}

/// Author or committer of a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitActor {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// A commit object (`GET /git/commits/{sha}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GitCommit {
    pub sha: ObjectId,
    pub tree: ShaRef,
    pub parents: Vec<ShaRef>,
    pub author: GitActor,
    pub committer: GitActor,
    pub message: String,
}

/// A tree object (`GET /git/trees/{sha}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    pub sha: ObjectId,
    pub tree: Vec<GitTreeEntry>,

    /// Set when the listing exceeded the API limit.
    #[serde(default)]
    pub truncated: bool,
}

/// One entry of a tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTreeEntry {
    pub path: String,

    /// Octal mode string such as `100644`.
    pub mode: String,

    #[serde(rename = "type")]
    pub kind: ObjectKind,

    pub sha: ObjectId,
}

/// A blob object (`GET /git/blobs/{sha}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GitBlob {
    pub sha: ObjectId,
    pub content: String,

    /// `base64` or `utf-8`.
    pub encoding: String,
}

/// Request to create a blob.
#[derive(Debug, Serialize)]
pub struct CreateBlob {
    pub content: String,
    pub encoding: String,
}

/// Response of any object-creating endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedObject {
    pub sha: ObjectId,
}

/// Request to create a tree on top of `base_tree`.
#[derive(Debug, Serialize)]
pub struct CreateTree {
    pub base_tree: ObjectId,
    pub tree: Vec<CreateTreeEntry>,
}

/// One path replacement in a tree creation request.
#[derive(Debug, Serialize)]
pub struct CreateTreeEntry {
    /// Path relative to the base tree; may contain `/`.
    pub path: String,
    pub mode: String,

    #[serde(rename = "type")]
    pub kind: ObjectKind,

    pub sha: ObjectId,
}

/// Request to create a commit.
#[derive(Debug, Serialize)]
pub struct CreateCommit {
    pub message: String,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: GitActor,
    pub committer: GitActor,
}

/// Request to move a ref.
#[derive(Debug, Serialize)]
pub struct UpdateRef {
    pub sha: ObjectId,

    /// When false, GitHub rejects updates that are not fast-forwards.
    pub force: bool,
}
