//! One read-modify-commit-update pass against an object store.
//!
//! An attempt reads the ref, patches the manifest, writes new blob, tree and
//! commit objects, and finally moves the ref with a compare-and-swap. Objects
//! written by an attempt that loses the race stay unreferenced; the ref never
//! points at them.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::field_path::FieldPath;
use crate::object::{NewCommit, ObjectId, Signature, Tree, TreeUpdate};
use crate::registry::{ImageReference, RegistryChecker, RegistryStatus};
use crate::resolve::{ResolvedBlob, resolve_path};
use crate::retry::RetryPolicy;
use crate::store::ObjectStore;
use crate::yaml::{DocumentSet, PatchOutcome};

/// Author and committer identity used for promotion commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "GitOps CI".into(),
            email: "ci@example.com".into(),
        }
    }
}

/// Everything one promotion needs to know.
#[derive(Debug, Clone)]
pub struct PromotionRequest {
    /// Fully-qualified ref to advance, e.g. `refs/heads/main`.
    pub ref_name: String,
    /// Repository-relative path of the manifest.
    pub path: String,
    /// Field receiving the new version.
    pub field: FieldPath,
    /// Field holding the image reference used for the registry check.
    pub repository_field: Option<FieldPath>,
    pub new_version: String,
    /// Name shown in the commit subject.
    pub message_name: String,
    pub identity: CommitIdentity,
}

impl PromotionRequest {
    /// Commit message for this promotion.
    #[must_use]
    pub fn commit_message(&self) -> String {
        format!("{}: new deploy ({})", self.message_name, self.new_version)
    }
}

/// What a successful promotion did to the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionStatus {
    /// The field already held the value; no objects were written.
    Unchanged { value: String },
    /// A new commit was created and the ref advanced.
    Updated { previous: String, current: String },
}

/// Result of a successful promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionOutcome {
    /// The new head, or the unchanged head for [`PromotionStatus::Unchanged`].
    pub commit: ObjectId,
    pub status: PromotionStatus,
    /// Registry verdict from the final attempt, if a check ran.
    pub registry: Option<RegistryStatus>,
    /// Number of attempts used.
    pub attempts: u32,
}

/// Documents loaded from a ref, ready for patching.
struct Snapshot {
    head: ObjectId,
    tree: Tree,
    file: ResolvedBlob,
    documents: DocumentSet,
}

/// Runs promotion attempts against a store.
pub struct TransactionRunner<'a, S: ObjectStore, R: RegistryChecker> {
    store: &'a S,
    registry: &'a R,
}

impl<'a, S: ObjectStore, R: RegistryChecker> TransactionRunner<'a, S, R> {
    /// Create a new runner.
    #[must_use]
    pub const fn new(store: &'a S, registry: &'a R) -> Self {
        Self { store, registry }
    }

    /// Promote under `policy`, retrying whole attempts on ref conflicts.
    ///
    /// # Errors
    /// Returns the first non-retryable error, or
    /// [`Error::RetriesExhausted`] if every attempt lost the race.
    pub async fn run(
        &self,
        request: &PromotionRequest,
        policy: &RetryPolicy,
    ) -> Result<PromotionOutcome> {
        if request.new_version.trim().is_empty() {
            return Err(Error::EmptyVersion);
        }

        policy
            .run(|number| async move {
                tracing::debug!(attempt = number, ref_name = %request.ref_name, "starting attempt");
                let mut outcome = self.attempt(request).await?;
                outcome.attempts = number;
                Ok(outcome)
            })
            .await
    }

    /// Run a single attempt.
    ///
    /// # Errors
    /// Returns [`Error::RefConflict`] when the ref moved since it was read;
    /// any other error is fatal.
    pub async fn attempt(&self, request: &PromotionRequest) -> Result<PromotionOutcome> {
        let Snapshot {
            head,
            tree,
            file,
            mut documents,
        } = self.snapshot(&request.ref_name, &request.path).await?;

        let (previous, current, content) =
            match documents.set(&request.field, &request.new_version)? {
                PatchOutcome::FieldMissing => {
                    return Err(Error::FieldNotFound(request.field.to_string()));
                }
                PatchOutcome::NoChange { current } => {
                    tracing::info!(field = %request.field, value = %current, commit = %head, "value already up to date");
                    return Ok(PromotionOutcome {
                        commit: head,
                        status: PromotionStatus::Unchanged { value: current },
                        registry: None,
                        attempts: 1,
                    });
                }
                PatchOutcome::Applied {
                    previous,
                    current,
                    content,
                } => (previous, current, content),
            };

        let registry = self.check_registry(request, &documents).await;

        let blob = self.store.save_blob(&content).await?;
        let new_tree = self
            .store
            .create_tree(
                &tree.id,
                &[TreeUpdate {
                    path: request.path.clone(),
                    mode: file.mode,
                    blob,
                }],
            )
            .await?;

        let signature = Signature {
            name: request.identity.name.clone(),
            email: request.identity.email.clone(),
            when: Utc::now(),
        };
        let commit = self
            .store
            .save_commit(&NewCommit {
                tree: new_tree,
                parents: vec![head.clone()],
                author: signature.clone(),
                committer: signature,
                message: request.commit_message(),
            })
            .await?;

        self.store
            .update_ref(&request.ref_name, &head, &commit)
            .await?;

        tracing::info!(
            ref_name = %request.ref_name,
            from = %head,
            to = %commit,
            %previous,
            %current,
            "promoted"
        );

        Ok(PromotionOutcome {
            commit,
            status: PromotionStatus::Updated { previous, current },
            registry,
            attempts: 1,
        })
    }

    /// Read the current value of `field` in the file at `path` on `ref_name`.
    ///
    /// # Errors
    /// Returns [`Error::MissingPath`], [`Error::YamlParse`] or
    /// [`Error::FieldNotFound`] as appropriate.
    pub async fn read_field(&self, ref_name: &str, path: &str, field: &FieldPath) -> Result<String> {
        let snapshot = self.snapshot(ref_name, path).await?;
        snapshot.documents.get(field)
    }

    async fn snapshot(&self, ref_name: &str, path: &str) -> Result<Snapshot> {
        let head = self.store.read_ref(ref_name).await?;
        let commit = self.store.load_commit(&head).await?;
        let tree = self.store.load_tree(&commit.tree).await?;
        tracing::debug!(%ref_name, %head, tree = %tree.id, "read ref");

        let file = resolve_path(self.store, &tree, path).await?;
        let content = self.store.load_blob(&file.blob).await?;
        let documents = DocumentSet::parse(&content)?;

        Ok(Snapshot {
            head,
            tree,
            file,
            documents,
        })
    }

    async fn check_registry(
        &self,
        request: &PromotionRequest,
        documents: &DocumentSet,
    ) -> Option<RegistryStatus> {
        let field = request.repository_field.as_ref()?;

        let value = match documents.get(field) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%field, "skipping registry check: {err}");
                return None;
            }
        };

        let Some(image) = ImageReference::parse(&value) else {
            tracing::warn!(%field, %value, "not an image reference; skipping registry check");
            return None;
        };
        if !self.registry.supports(&image) {
            tracing::warn!(%image, "registry not covered by the configured check; skipping it");
            return None;
        }

        let status = RegistryStatus::from(
            self.registry
                .tag_exists(&image, &request.new_version)
                .await,
        );
        match &status {
            RegistryStatus::Found => {
                tracing::info!(%image, tag = %request.new_version, "tag found in registry");
            }
            RegistryStatus::NotFound => {
                tracing::warn!(%image, tag = %request.new_version, "tag not found in registry");
            }
            RegistryStatus::Failed(message) => {
                tracing::warn!(%image, tag = %request.new_version, "{message}");
            }
        }
        Some(status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::object::FileMode;
    use crate::registry::{NoRegistry, RegistryError, TagLookup};
    use crate::store::StoreError;
    use crate::test_mocks::{MockRegistry, MockStore};

    const REF: &str = "refs/heads/main";
    const VALUES: &str = "\
image:
  repository: 123456789012.dkr.ecr.us-east-1.amazonaws.com/app
  tag: app:v1
---
kind: Service
";

    fn request(version: &str) -> PromotionRequest {
        PromotionRequest {
            ref_name: REF.into(),
            path: "deploy/values.yaml".into(),
            field: FieldPath::parse("image.tag").unwrap(),
            repository_field: None,
            new_version: version.into(),
            message_name: "gitops".into(),
            identity: CommitIdentity::default(),
        }
    }

    fn store() -> MockStore {
        MockStore::with_files(
            REF,
            &[
                ("deploy/values.yaml", VALUES.as_bytes(), FileMode::BLOB),
                ("README.md", b"# gitops\n".as_slice(), FileMode::BLOB),
            ],
        )
    }

    fn no_delay(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_promotion_creates_commit_on_head() {
        let store = store();
        let original_head = store.head(REF).unwrap();
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let outcome = runner.run(&request("v2"), &no_delay(2)).await.unwrap();

        assert_eq!(
            outcome.status,
            PromotionStatus::Updated {
                previous: "app:v1".into(),
                current: "app:v2".into()
            }
        );
        assert_eq!(outcome.attempts, 1);
        assert_eq!(store.head(REF).unwrap(), outcome.commit);

        let commit = store.commit(&outcome.commit).unwrap();
        assert_eq!(commit.parents, vec![original_head]);
        assert_eq!(commit.message, "gitops: new deploy (v2)");
        assert_eq!(commit.author.name, "GitOps CI");
        assert_eq!(commit.committer.email, "ci@example.com");

        let content = store.file_at(&outcome.commit, "deploy/values.yaml").unwrap();
        let docs = DocumentSet::parse(&content).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs.get(&FieldPath::parse("image.tag").unwrap()).unwrap(),
            "app:v2"
        );
    }

    #[tokio::test]
    async fn test_untouched_files_are_shared() {
        let store = store();
        let before = store.head(REF).unwrap();
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let outcome = runner.run(&request("v2"), &no_delay(1)).await.unwrap();

        assert_eq!(
            store.entry_id(&before, "README.md"),
            store.entry_id(&outcome.commit, "README.md")
        );
        assert_ne!(
            store.entry_id(&before, "deploy/values.yaml"),
            store.entry_id(&outcome.commit, "deploy/values.yaml")
        );
    }

    #[tokio::test]
    async fn test_same_value_writes_nothing() {
        let store = store();
        let head = store.head(REF).unwrap();
        let writes = store.write_count();
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let outcome = runner.run(&request("v1"), &no_delay(2)).await.unwrap();

        assert_eq!(outcome.commit, head);
        assert_eq!(
            outcome.status,
            PromotionStatus::Unchanged {
                value: "app:v1".into()
            }
        );
        assert_eq!(store.write_count(), writes);
        assert_eq!(store.ref_updates(), 0);
    }

    #[tokio::test]
    async fn test_missing_path_performs_no_writes() {
        let store = store();
        let writes = store.write_count();
        let runner = TransactionRunner::new(&store, &NoRegistry);
        let mut req = request("v2");
        req.path = "deploy/absent.yaml".into();

        let result = runner.run(&req, &no_delay(3)).await;

        assert!(matches!(result, Err(Error::MissingPath(p)) if p == "deploy/absent.yaml"));
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_empty_path_segment_fails_before_writing() {
        let store = store();
        let writes = store.write_count();
        let runner = TransactionRunner::new(&store, &NoRegistry);
        let mut req = request("v2");
        req.path = "deploy//values.yaml".into();

        let result = runner.run(&req, &no_delay(3)).await;

        assert!(matches!(result, Err(Error::MissingPath(p)) if p == "deploy//values.yaml"));
        assert_eq!(store.write_count(), writes);
        assert_eq!(store.ref_updates(), 0);
    }

    #[tokio::test]
    async fn test_missing_field_is_fatal() {
        let store = store();
        let runner = TransactionRunner::new(&store, &NoRegistry);
        let mut req = request("v2");
        req.field = FieldPath::parse("image.digest").unwrap();

        let result = runner.run(&req, &no_delay(3)).await;

        assert!(matches!(result, Err(Error::FieldNotFound(f)) if f == "image.digest"));
        assert_eq!(store.ref_updates(), 0);
    }

    #[tokio::test]
    async fn test_malformed_yaml_is_fatal() {
        let store = MockStore::with_files(
            REF,
            &[("deploy/values.yaml", b"image: [oops\n".as_slice(), FileMode::BLOB)],
        );
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let result = runner.run(&request("v2"), &no_delay(3)).await;

        assert!(matches!(result, Err(Error::YamlParse(_))));
    }

    #[tokio::test]
    async fn test_empty_version_rejected() {
        let store = store();
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let result = runner.run(&request("  "), &no_delay(1)).await;

        assert!(matches!(result, Err(Error::EmptyVersion)));
    }

    #[tokio::test]
    async fn test_conflict_retry_builds_on_concurrent_commit() {
        let store = store();
        store.interfere(1);
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let outcome = runner.run(&request("v2"), &no_delay(2)).await.unwrap();

        assert_eq!(outcome.attempts, 2);
        let concurrent = store.concurrent_commits();
        assert_eq!(concurrent.len(), 1);

        let commit = store.commit(&outcome.commit).unwrap();
        assert_eq!(commit.parents, vec![concurrent[0].clone()]);
        assert_eq!(store.head(REF).unwrap(), outcome.commit);
    }

    #[tokio::test]
    async fn test_conflict_on_every_attempt_exhausts_budget() {
        let store = store();
        store.interfere(u32::MAX);
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let result = runner.run(&request("v2"), &no_delay(3)).await;

        match result {
            Err(Error::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, Error::RefConflict { .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(store.ref_updates(), 3);
        assert_eq!(store.concurrent_commits().len(), 3);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_retried() {
        let store = store();
        store.fail_ref_updates_with(|| StoreError::backend("connection reset"));
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let result = runner.run(&request("v2"), &no_delay(3)).await;

        assert!(matches!(result, Err(Error::Store(StoreError::Backend(_)))));
        assert_eq!(store.ref_updates(), 1);
    }

    #[tokio::test]
    async fn test_registry_not_found_still_commits() {
        let store = store();
        let registry = MockRegistry::answering(Ok(TagLookup::NotFound));
        let runner = TransactionRunner::new(&store, &registry);
        let mut req = request("v2");
        req.repository_field = Some(FieldPath::parse("image.repository").unwrap());

        let outcome = runner.run(&req, &no_delay(1)).await.unwrap();

        assert_eq!(outcome.registry, Some(RegistryStatus::NotFound));
        assert!(matches!(outcome.status, PromotionStatus::Updated { .. }));
        assert_eq!(store.head(REF).unwrap(), outcome.commit);

        let asked = registry.queries();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].0.repository, "app");
        assert_eq!(asked[0].1, "v2");
    }

    #[tokio::test]
    async fn test_registry_failure_surfaces_as_status() {
        let store = store();
        let registry = MockRegistry::answering(Err(RegistryError::new("app", "throttled")));
        let runner = TransactionRunner::new(&store, &registry);
        let mut req = request("v2");
        req.repository_field = Some(FieldPath::parse("image.repository").unwrap());

        let outcome = runner.run(&req, &no_delay(1)).await.unwrap();

        assert!(matches!(
            outcome.registry,
            Some(RegistryStatus::Failed(ref msg)) if msg.contains("throttled")
        ));
        assert!(matches!(outcome.status, PromotionStatus::Updated { .. }));
    }

    #[tokio::test]
    async fn test_registry_skipped_for_unsupported_reference() {
        let store = store();
        let registry = MockRegistry::answering(Ok(TagLookup::Found)).supporting_none();
        let runner = TransactionRunner::new(&store, &registry);
        let mut req = request("v2");
        req.repository_field = Some(FieldPath::parse("image.repository").unwrap());

        let outcome = runner.run(&req, &no_delay(1)).await.unwrap();

        assert_eq!(outcome.registry, None);
        assert!(registry.queries().is_empty());
    }

    #[tokio::test]
    async fn test_read_field() {
        let store = store();
        let runner = TransactionRunner::new(&store, &NoRegistry);

        let value = runner
            .read_field(
                REF,
                "deploy/values.yaml",
                &FieldPath::parse("image.repository").unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(value, "123456789012.dkr.ecr.us-east-1.amazonaws.com/app");
    }
}
