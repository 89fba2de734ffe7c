//! [`ObjectStore`] implementation over a local repository.
//!
//! libgit2 calls are blocking and cheap, so every method completes before
//! returning a ready future.

use std::future::{Future, ready};

use chrono::{DateTime, Utc};
use git2::{ErrorCode, ObjectType, Oid, Time};
use tagbump_core::{
    Commit, FileMode, GitObjectRef, NewCommit, ObjectId, ObjectKind, ObjectStore, Signature,
    StoreError, StoreResult, Tree, TreeEntry, TreeUpdate,
};

use crate::error::Error;
use crate::repository::Repository;

fn to_oid(id: &ObjectId) -> StoreResult<Oid> {
    Oid::from_str(id.as_str()).map_err(StoreError::backend)
}

fn to_object_id(oid: Oid) -> StoreResult<ObjectId> {
    ObjectId::parse(&oid.to_string()).map_err(|e| StoreError::backend(Error::from(e)))
}

fn to_kind(kind: ObjectType) -> Option<ObjectKind> {
    match kind {
        ObjectType::Blob => Some(ObjectKind::Blob),
        ObjectType::Tree => Some(ObjectKind::Tree),
        ObjectType::Commit => Some(ObjectKind::Commit),
        _ => None,
    }
}

fn backend(err: impl Into<Error>) -> StoreError {
    StoreError::backend(err.into())
}

fn to_signature(signature: &git2::Signature<'_>) -> Signature {
    let when = signature.when();
    Signature {
        name: String::from_utf8_lossy(signature.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(signature.email_bytes()).into_owned(),
        when: DateTime::<Utc>::from_timestamp(when.seconds(), 0).unwrap_or_default(),
    }
}

fn from_signature(signature: &Signature) -> StoreResult<git2::Signature<'static>> {
    git2::Signature::new(
        &signature.name,
        &signature.email,
        &Time::new(signature.when.timestamp(), 0),
    )
    .map_err(backend)
}

impl Repository {
    /// Look up an object, checking its kind.
    fn object(&self, id: &ObjectId, expected: ObjectKind) -> StoreResult<git2::Object<'_>> {
        let object = match self.inner().find_object(to_oid(id)?, None) {
            Ok(object) => object,
            Err(err) if err.code() == ErrorCode::NotFound => {
                return Err(StoreError::ObjectNotFound(id.clone()));
            }
            Err(err) => return Err(backend(err)),
        };

        match object.kind().and_then(to_kind) {
            Some(actual) if actual == expected => Ok(object),
            Some(actual) => Err(StoreError::UnexpectedKind {
                id: id.clone(),
                expected,
                actual,
            }),
            None => Err(StoreError::ObjectNotFound(id.clone())),
        }
    }

    fn read_ref_sync(&self, name: &str) -> StoreResult<ObjectId> {
        match self.ref_target(name).map_err(backend)? {
            Some(oid) => to_object_id(oid),
            None => Err(StoreError::RefNotFound(name.to_string())),
        }
    }

    fn load_commit_sync(&self, id: &ObjectId) -> StoreResult<Commit> {
        let object = self.object(id, ObjectKind::Commit)?;
        let commit = object
            .peel_to_commit()
            .map_err(backend)?;

        Ok(Commit {
            id: id.clone(),
            tree: to_object_id(commit.tree_id())?,
            parents: commit
                .parent_ids()
                .map(to_object_id)
                .collect::<StoreResult<_>>()?,
            author: to_signature(&commit.author()),
            committer: to_signature(&commit.committer()),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        })
    }

    fn load_tree_sync(&self, id: &ObjectId) -> StoreResult<Tree> {
        let object = self.object(id, ObjectKind::Tree)?;
        let tree = object.peel_to_tree().map_err(backend)?;

        let mut entries = Vec::with_capacity(tree.len());
        for entry in &tree {
            let Some(kind) = entry.kind().and_then(to_kind) else {
                continue;
            };
            let mode = u32::try_from(entry.filemode())
                .map_err(|_| backend(Error::InvalidPath(format!("{:o}", entry.filemode()))))?;
            entries.push(TreeEntry {
                name: String::from_utf8_lossy(entry.name_bytes()).into_owned(),
                mode: FileMode::from_raw(mode),
                object: GitObjectRef {
                    id: to_object_id(entry.id())?,
                    kind,
                },
            });
        }

        Ok(Tree::new(id.clone(), entries))
    }

    fn load_blob_sync(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        let object = self.object(id, ObjectKind::Blob)?;
        let blob = object.peel_to_blob().map_err(backend)?;
        Ok(blob.content().to_vec())
    }

    fn save_blob_sync(&self, content: &[u8]) -> StoreResult<ObjectId> {
        let oid = self.inner().blob(content).map_err(backend)?;
        tracing::debug!(blob = %oid, bytes = content.len(), "wrote blob");
        to_object_id(oid)
    }

    fn create_tree_sync(&self, base: &ObjectId, updates: &[TreeUpdate]) -> StoreResult<ObjectId> {
        self.object(base, ObjectKind::Tree)?;

        let mut tree = to_oid(base)?;
        for update in updates {
            let mode = i32::try_from(update.mode.raw())
                .map_err(|_| backend(Error::InvalidPath(update.path.clone())))?;
            tree = self
                .replace_path(tree, &update.path, mode, to_oid(&update.blob)?)
                .map_err(backend)?;
        }

        tracing::debug!(%tree, %base, "wrote tree");
        to_object_id(tree)
    }

    fn save_commit_sync(&self, commit: &NewCommit) -> StoreResult<ObjectId> {
        let parents = commit
            .parents
            .iter()
            .map(to_oid)
            .collect::<StoreResult<Vec<_>>>()?;
        let oid = self
            .write_commit(
                to_oid(&commit.tree)?,
                &parents,
                &from_signature(&commit.author)?,
                &from_signature(&commit.committer)?,
                &commit.message,
            )
            .map_err(backend)?;

        tracing::debug!(commit = %oid, "wrote commit");
        to_object_id(oid)
    }

    fn update_ref_sync(&self, name: &str, expected: &ObjectId, new: &ObjectId) -> StoreResult<()> {
        if self.ref_target(name).map_err(backend)?.is_none() {
            return Err(StoreError::RefNotFound(name.to_string()));
        }

        if self
            .compare_and_swap(name, to_oid(expected)?, to_oid(new)?)
            .map_err(backend)?
        {
            Ok(())
        } else {
            Err(StoreError::RefConflict {
                ref_name: name.to_string(),
                expected: expected.clone(),
            })
        }
    }
}

impl ObjectStore for Repository {
    fn read_ref(&self, name: &str) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        ready(self.read_ref_sync(name))
    }

    fn load_commit(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Commit>> + Send {
        ready(self.load_commit_sync(id))
    }

    fn load_tree(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Tree>> + Send {
        ready(self.load_tree_sync(id))
    }

    fn load_blob(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Vec<u8>>> + Send {
        ready(self.load_blob_sync(id))
    }

    fn save_blob(&self, content: &[u8]) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        ready(self.save_blob_sync(content))
    }

    fn create_tree(
        &self,
        base: &ObjectId,
        updates: &[TreeUpdate],
    ) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        ready(self.create_tree_sync(base, updates))
    }

    fn save_commit(
        &self,
        commit: &NewCommit,
    ) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        ready(self.save_commit_sync(commit))
    }

    fn update_ref(
        &self,
        name: &str,
        expected: &ObjectId,
        new: &ObjectId,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        ready(self.update_ref_sync(name, expected, new))
    }
}
