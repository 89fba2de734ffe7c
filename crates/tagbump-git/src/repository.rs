//! Repository wrapper providing the low-level writes a promotion needs.

use std::path::Path;

use git2::{ErrorCode, FileMode, ObjectType, Oid, Signature};

use crate::error::{Error, Result};

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = git2::Repository::discover(path).map_err(|err| match err.code() {
            ErrorCode::NotFound => Error::NotARepository(path.display().to_string()),
            _ => Error::Git2(err),
        })?;
        Ok(Self { inner })
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    // === Tree operations ===

    /// Write a tree equal to `base` with the blob at `path` replaced.
    ///
    /// Missing intermediate directories are created; sibling entries keep
    /// their ids.
    ///
    /// # Errors
    /// Returns error if `path` has an empty component or a write fails.
    pub fn replace_path(&self, base: Oid, path: &str, mode: i32, blob: Oid) -> Result<Oid> {
        let components: Vec<&str> = path.trim_matches('/').split('/').collect();
        if components.iter().any(|c| c.is_empty()) {
            return Err(Error::InvalidPath(path.to_string()));
        }

        let base = self.inner.find_tree(base)?;
        self.rebuild(Some(&base), &components, mode, blob)
    }

    fn rebuild(
        &self,
        base: Option<&git2::Tree<'_>>,
        components: &[&str],
        mode: i32,
        blob: Oid,
    ) -> Result<Oid> {
        let mut builder = self.inner.treebuilder(base)?;

        match components {
            [] => return Err(Error::InvalidPath(String::new())),
            [name] => {
                builder.insert(*name, blob, mode)?;
            }
            [name, rest @ ..] => {
                let child = match base.and_then(|tree| tree.get_name(name)) {
                    Some(entry) if entry.kind() == Some(ObjectType::Tree) => {
                        Some(self.inner.find_tree(entry.id())?)
                    }
                    _ => None,
                };
                let child_id = self.rebuild(child.as_ref(), rest, mode, blob)?;
                builder.insert(*name, child_id, FileMode::Tree.into())?;
            }
        }

        Ok(builder.write()?)
    }

    // === Commit operations ===

    /// Write a commit without touching any ref.
    ///
    /// # Errors
    /// Returns error if the tree or a parent is missing.
    pub fn write_commit(
        &self,
        tree: Oid,
        parents: &[Oid],
        author: &Signature<'_>,
        committer: &Signature<'_>,
        message: &str,
    ) -> Result<Oid> {
        let tree = self.inner.find_tree(tree)?;
        let parents = parents
            .iter()
            .map(|id| self.inner.find_commit(*id))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        Ok(self
            .inner
            .commit(None, author, committer, message, &tree, &parent_refs)?)
    }

    // === Ref operations ===

    /// Current target of a direct reference, `None` if it does not exist.
    ///
    /// # Errors
    /// Returns error if the ref cannot be read.
    pub fn ref_target(&self, name: &str) -> Result<Option<Oid>> {
        match self.inner.find_reference(name) {
            Ok(reference) => Ok(reference.resolve()?.target()),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Move `name` to `new` only if it still points at `expected`.
    ///
    /// Returns `false` without writing when the ref moved.
    ///
    /// # Errors
    /// Returns error if the ref cannot be written.
    pub fn compare_and_swap(&self, name: &str, expected: Oid, new: Oid) -> Result<bool> {
        if self.ref_target(name)? != Some(expected) {
            return Ok(false);
        }

        let message = format!("tagbump: {} -> {}", short(expected), short(new));
        match self
            .inner
            .reference_matching(name, new, true, expected, &message)
        {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.code(), ErrorCode::Modified | ErrorCode::Locked) => {
                tracing::debug!(%name, "reference changed during update: {err}");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

fn short(id: Oid) -> String {
    id.to_string().chars().take(8).collect()
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}
