//! [`ObjectStore`] implementation over the GitHub Git Data API.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tagbump_core::store::StoreResult;
use tagbump_core::{
    Commit, GitObjectRef, NewCommit, ObjectId, ObjectKind, ObjectStore, Signature, StoreError,
    Tree, TreeEntry, TreeUpdate,
};

use crate::client::GitHubClient;
use crate::error::Error;
use crate::types::{
    CreateBlob, CreateCommit, CreateTree, CreateTreeEntry, GitActor, GitBlob, UpdateRef,
};

/// Object store for one GitHub repository.
#[derive(Debug)]
pub struct GitHubStore {
    client: GitHubClient,
    owner: String,
    repo: String,
}

impl GitHubStore {
    /// Create a store for `owner/repo`.
    #[must_use]
    pub fn new(client: GitHubClient, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    async fn current_ref(&self, name: &str) -> StoreResult<ObjectId> {
        match self.client.get_ref(&self.owner, &self.repo, name).await {
            Ok(git_ref) if git_ref.object.kind == ObjectKind::Commit => Ok(git_ref.object.sha),
            Ok(git_ref) => Err(StoreError::UnexpectedKind {
                id: git_ref.object.sha,
                expected: ObjectKind::Commit,
                actual: git_ref.object.kind,
            }),
            // 409 is returned for a repository without commits.
            Err(err) if matches!(err.status(), Some(404 | 409)) => {
                Err(StoreError::RefNotFound(name.to_string()))
            }
            Err(err) => Err(StoreError::backend(err)),
        }
    }
}

/// Map a lookup failure, turning 404 into [`StoreError::ObjectNotFound`].
fn lookup_error(id: &ObjectId) -> impl FnOnce(Error) -> StoreError + '_ {
    move |err| match err.status() {
        Some(404 | 422) => StoreError::ObjectNotFound(id.clone()),
        _ => StoreError::backend(err),
    }
}

fn signature(actor: GitActor) -> Signature {
    Signature {
        name: actor.name,
        email: actor.email,
        when: actor.date,
    }
}

fn actor(signature: &Signature) -> GitActor {
    GitActor {
        name: signature.name.clone(),
        email: signature.email.clone(),
        date: signature.when,
    }
}

fn decode_blob(blob: GitBlob) -> Result<Vec<u8>, Error> {
    match blob.encoding.as_str() {
        "base64" => {
            // The API wraps base64 content at 60 columns.
            let compact: String = blob.content.split_whitespace().collect();
            Ok(STANDARD.decode(compact)?)
        }
        "utf-8" | "utf8" => Ok(blob.content.into_bytes()),
        other => Err(Error::UnsupportedEncoding(other.to_string())),
    }
}

impl ObjectStore for GitHubStore {
    async fn read_ref(&self, name: &str) -> StoreResult<ObjectId> {
        self.current_ref(name).await
    }

    async fn load_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        let commit = self
            .client
            .get_commit(&self.owner, &self.repo, id.as_str())
            .await
            .map_err(lookup_error(id))?;

        Ok(Commit {
            id: commit.sha,
            tree: commit.tree.sha,
            parents: commit.parents.into_iter().map(|p| p.sha).collect(),
            author: signature(commit.author),
            committer: signature(commit.committer),
            message: commit.message,
        })
    }

    async fn load_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let tree = self
            .client
            .get_tree(&self.owner, &self.repo, id.as_str())
            .await
            .map_err(lookup_error(id))?;

        let entries = tree
            .tree
            .into_iter()
            .map(|entry| {
                let mode = entry
                    .mode
                    .parse()
                    .map_err(|e| StoreError::backend(Error::InvalidObject(e)))?;
                Ok(TreeEntry {
                    name: entry.path,
                    mode,
                    object: GitObjectRef {
                        id: entry.sha,
                        kind: entry.kind,
                    },
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Tree::new(tree.sha, entries))
    }

    async fn load_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        let blob = self
            .client
            .get_blob(&self.owner, &self.repo, id.as_str())
            .await
            .map_err(lookup_error(id))?;

        decode_blob(blob).map_err(StoreError::backend)
    }

    async fn save_blob(&self, content: &[u8]) -> StoreResult<ObjectId> {
        let request = CreateBlob {
            content: STANDARD.encode(content),
            encoding: "base64".into(),
        };
        let created = self
            .client
            .create_blob(&self.owner, &self.repo, &request)
            .await
            .map_err(StoreError::backend)?;

        tracing::debug!(blob = %created.sha, bytes = content.len(), "created blob");
        Ok(created.sha)
    }

    async fn create_tree(&self, base: &ObjectId, updates: &[TreeUpdate]) -> StoreResult<ObjectId> {
        let request = CreateTree {
            base_tree: base.clone(),
            tree: updates
                .iter()
                .map(|update| CreateTreeEntry {
                    path: update.path.trim_matches('/').to_string(),
                    mode: update.mode.to_string(),
                    kind: update.mode.kind(),
                    sha: update.blob.clone(),
                })
                .collect(),
        };
        let created = self
            .client
            .create_tree(&self.owner, &self.repo, &request)
            .await
            .map_err(StoreError::backend)?;

        tracing::debug!(tree = %created.sha, base = %base, "created tree");
        Ok(created.sha)
    }

    async fn save_commit(&self, commit: &NewCommit) -> StoreResult<ObjectId> {
        let request = CreateCommit {
            message: commit.message.clone(),
            tree: commit.tree.clone(),
            parents: commit.parents.clone(),
            author: actor(&commit.author),
            committer: actor(&commit.committer),
        };
        let created = self
            .client
            .create_commit(&self.owner, &self.repo, &request)
            .await
            .map_err(StoreError::backend)?;

        tracing::debug!(commit = %created.sha, "created commit");
        Ok(created.sha)
    }

    async fn update_ref(&self, name: &str, expected: &ObjectId, new: &ObjectId) -> StoreResult<()> {
        let conflict = || StoreError::RefConflict {
            ref_name: name.to_string(),
            expected: expected.clone(),
        };

        let current = self.current_ref(name).await?;
        if &current != expected {
            tracing::debug!(%name, %current, %expected, "ref moved before update");
            return Err(conflict());
        }

        // The new commit's only parent is `expected`, so any concurrent
        // advance turns this into a rejected non-fast-forward update.
        let update = UpdateRef {
            sha: new.clone(),
            force: false,
        };
        match self
            .client
            .update_ref(&self.owner, &self.repo, name, &update)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.status() == Some(422) => {
                tracing::debug!(%name, "ref update rejected as non-fast-forward: {err}");
                Err(conflict())
            }
            Err(err) => Err(StoreError::backend(err)),
        }
    }
}
