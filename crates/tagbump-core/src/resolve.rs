//! Locating a file inside a tree snapshot.

use crate::error::{Error, Result};
use crate::object::{FileMode, ObjectId, ObjectKind, Tree};
use crate::store::ObjectStore;

/// The blob found at a repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBlob {
    pub mode: FileMode,
    pub blob: ObjectId,
}

/// Walk `path` from `root`, loading each intermediate tree from `store`.
///
/// # Errors
/// Returns [`Error::MissingPath`] if the path has an empty segment, if an
/// intermediate segment is absent or not a tree, or if the final segment is
/// absent or not a blob.
pub async fn resolve_path<S: ObjectStore>(
    store: &S,
    root: &Tree,
    path: &str,
) -> Result<ResolvedBlob> {
    let missing = || Error::MissingPath(path.to_string());

    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(missing());
    }
    let Some((file_name, dirs)) = segments.split_last() else {
        return Err(missing());
    };

    let mut subtree: Option<Tree> = None;
    for dir in dirs {
        let current = subtree.as_ref().unwrap_or(root);
        let entry = current.get(dir).ok_or_else(missing)?;
        if entry.object.kind != ObjectKind::Tree {
            return Err(missing());
        }
        tracing::debug!(segment = %dir, tree = %entry.object.id, "descending into tree");
        subtree = Some(store.load_tree(&entry.object.id).await?);
    }

    let current = subtree.as_ref().unwrap_or(root);
    let entry = current.get(file_name).ok_or_else(missing)?;
    if entry.object.kind != ObjectKind::Blob {
        return Err(missing());
    }

    Ok(ResolvedBlob {
        mode: entry.mode,
        blob: entry.object.id.clone(),
    })
}
