//! Git object model shared by every object-store backend.
//!
//! Objects are content addressed and immutable: any change produces a new
//! object with a new [`ObjectId`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hex-encoded content hash of a git object (SHA-1 or SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse a hex object id, normalizing to lowercase.
    ///
    /// # Errors
    /// Returns error unless the input is 40 or 64 hex digits.
    pub fn parse(hex: &str) -> Result<Self> {
        let valid_len = matches!(hex.len(), 40 | 64);
        if !valid_len || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidObjectId(hex.to_string()));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// The full hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// Kind of a git object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        })
    }
}

/// A typed pointer to an object; identity is the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitObjectRef {
    pub id: ObjectId,
    pub kind: ObjectKind,
}

/// Git file mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    pub const BLOB: Self = Self(0o100_644);
    pub const EXECUTABLE: Self = Self(0o100_755);
    pub const SYMLINK: Self = Self(0o120_000);
    pub const TREE: Self = Self(0o040_000);
    pub const SUBMODULE: Self = Self(0o160_000);

    /// Wrap a raw mode as reported by libgit2.
    #[must_use]
    pub const fn from_raw(mode: u32) -> Self {
        Self(mode)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Object kind referenced by entries with this mode.
    #[must_use]
    pub const fn kind(self) -> ObjectKind {
        match self.0 {
            0o040_000 => ObjectKind::Tree,
            0o160_000 => ObjectKind::Commit,
            _ => ObjectKind::Blob,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}

impl FromStr for FileMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        u32::from_str_radix(s, 8)
            .map(Self)
            .map_err(|_| Error::InvalidFileMode(s.to_string()))
    }
}

/// One named entry inside a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: FileMode,
    pub object: GitObjectRef,
}

/// Directory snapshot: an ordered mapping of entry name to entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub id: ObjectId,
    pub entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Build a tree from its entries.
    #[must_use]
    pub fn new(id: ObjectId, entries: impl IntoIterator<Item = TreeEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.name.clone(), entry))
            .collect();
        Self { id, entries }
    }

    /// Look up a direct child by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }
}

/// Author or committer identity with timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

/// A stored commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: ObjectId,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

/// A commit that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

/// Replacement of the blob at `path` when deriving a tree from a base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeUpdate {
    /// `/`-separated path relative to the base tree.
    pub path: String,
    pub mode: FileMode,
    pub blob: ObjectId,
}
