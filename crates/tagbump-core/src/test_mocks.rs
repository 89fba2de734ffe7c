//! Mock implementations for testing transactions.
//!
//! `MockStore` is a content-addressed in-memory object database that can
//! simulate a competing writer advancing a ref right before each update.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::future::{Future, ready};
use std::hash::{Hash, Hasher};

use chrono::{TimeZone, Utc};

use crate::object::{
    Commit, FileMode, GitObjectRef, NewCommit, ObjectId, ObjectKind, Signature, Tree, TreeEntry,
    TreeUpdate,
};
use crate::registry::{ImageReference, RegistryChecker, RegistryError, TagLookup};
use crate::store::{ObjectStore, StoreError, StoreResult};

#[derive(Clone)]
enum Object {
    Blob(Vec<u8>),
    Tree(Vec<TreeEntry>),
    Commit(Commit),
}

type FailureFn = Box<dyn Fn() -> StoreError>;

#[derive(Default)]
struct Inner {
    objects: HashMap<ObjectId, Object>,
    refs: HashMap<String, ObjectId>,
    writes: usize,
    ref_updates: usize,
    interference: u32,
    concurrent: Vec<ObjectId>,
    fail_update: Option<FailureFn>,
}

/// In-memory object store.
#[derive(Default)]
pub struct MockStore {
    inner: RefCell<Inner>,
}

fn content_id(kind: ObjectKind, parts: &[&[u8]]) -> ObjectId {
    let mut hasher = DefaultHasher::new();
    kind.hash(&mut hasher);
    for part in parts {
        part.hash(&mut hasher);
    }
    let hex = format!("{:040x}", hasher.finish());
    ObjectId::parse(&hex).unwrap()
}

fn signature() -> Signature {
    Signature {
        name: "Someone Else".into(),
        email: "someone@example.com".into(),
        when: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

impl Inner {
    fn put_blob(&mut self, content: &[u8]) -> ObjectId {
        let id = content_id(ObjectKind::Blob, &[content]);
        self.objects.insert(id.clone(), Object::Blob(content.to_vec()));
        id
    }

    fn put_tree(&mut self, entries: Vec<TreeEntry>) -> ObjectId {
        let mut encoded = Vec::new();
        for entry in &entries {
            encoded.extend_from_slice(
                format!("{} {} {}\n", entry.mode, entry.name, entry.object.id).as_bytes(),
            );
        }
        let id = content_id(ObjectKind::Tree, &[&encoded]);
        self.objects.insert(id.clone(), Object::Tree(entries));
        id
    }

    fn put_commit(&mut self, commit: &NewCommit) -> ObjectId {
        let parents: Vec<&str> = commit.parents.iter().map(ObjectId::as_str).collect();
        let id = content_id(
            ObjectKind::Commit,
            &[
                commit.tree.as_str().as_bytes(),
                parents.join(" ").as_bytes(),
                commit.message.as_bytes(),
                commit.author.when.to_rfc3339().as_bytes(),
            ],
        );
        self.objects.insert(
            id.clone(),
            Object::Commit(Commit {
                id: id.clone(),
                tree: commit.tree.clone(),
                parents: commit.parents.clone(),
                author: commit.author.clone(),
                committer: commit.committer.clone(),
                message: commit.message.clone(),
            }),
        );
        id
    }

    fn tree_entries(&self, id: &ObjectId) -> StoreResult<Vec<TreeEntry>> {
        match self.objects.get(id) {
            Some(Object::Tree(entries)) => Ok(entries.clone()),
            Some(other) => Err(StoreError::UnexpectedKind {
                id: id.clone(),
                expected: ObjectKind::Tree,
                actual: kind_of(other),
            }),
            None => Err(StoreError::ObjectNotFound(id.clone())),
        }
    }

    fn commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        match self.objects.get(id) {
            Some(Object::Commit(commit)) => Ok(commit.clone()),
            Some(other) => Err(StoreError::UnexpectedKind {
                id: id.clone(),
                expected: ObjectKind::Commit,
                actual: kind_of(other),
            }),
            None => Err(StoreError::ObjectNotFound(id.clone())),
        }
    }

    /// Write a tree from `path -> (mode, blob)` pairs, creating subtrees.
    fn build_tree(&mut self, files: &BTreeMap<String, (FileMode, ObjectId)>) -> ObjectId {
        let mut direct = Vec::new();
        let mut nested: BTreeMap<String, BTreeMap<String, (FileMode, ObjectId)>> = BTreeMap::new();

        for (path, (mode, blob)) in files {
            match path.split_once('/') {
                Some((dir, rest)) => {
                    nested
                        .entry(dir.to_string())
                        .or_default()
                        .insert(rest.to_string(), (*mode, blob.clone()));
                }
                None => direct.push(TreeEntry {
                    name: path.clone(),
                    mode: *mode,
                    object: GitObjectRef {
                        id: blob.clone(),
                        kind: ObjectKind::Blob,
                    },
                }),
            }
        }

        for (dir, children) in nested {
            let id = self.build_tree(&children);
            direct.push(TreeEntry {
                name: dir,
                mode: FileMode::TREE,
                object: GitObjectRef {
                    id,
                    kind: ObjectKind::Tree,
                },
            });
        }

        direct.sort_by(|a, b| a.name.cmp(&b.name));
        self.put_tree(direct)
    }

    fn replace(
        &mut self,
        tree: Option<&ObjectId>,
        segments: &[&str],
        mode: FileMode,
        blob: &ObjectId,
    ) -> StoreResult<ObjectId> {
        let mut entries = match tree {
            Some(id) => self.tree_entries(id)?,
            None => Vec::new(),
        };
        let (name, rest) = segments
            .split_first()
            .ok_or_else(|| StoreError::backend("empty path"))?;

        let entry = if rest.is_empty() {
            TreeEntry {
                name: (*name).to_string(),
                mode,
                object: GitObjectRef {
                    id: blob.clone(),
                    kind: ObjectKind::Blob,
                },
            }
        } else {
            let existing = entries
                .iter()
                .find(|e| e.name == *name && e.object.kind == ObjectKind::Tree)
                .map(|e| e.object.id.clone());
            let id = self.replace(existing.as_ref(), rest, mode, blob)?;
            TreeEntry {
                name: (*name).to_string(),
                mode: FileMode::TREE,
                object: GitObjectRef {
                    id,
                    kind: ObjectKind::Tree,
                },
            }
        };

        entries.retain(|e| e.name != *name);
        entries.push(entry);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(self.put_tree(entries))
    }

    /// Simulate another writer committing on top of `ref_name`.
    fn advance_concurrently(&mut self, ref_name: &str) {
        let Some(head) = self.refs.get(ref_name).cloned() else {
            return;
        };
        let Ok(parent) = self.commit(&head) else {
            return;
        };
        let message = format!("concurrent change {}", self.concurrent.len() + 1);
        let id = self.put_commit(&NewCommit {
            tree: parent.tree,
            parents: vec![head],
            author: signature(),
            committer: signature(),
            message,
        });
        self.refs.insert(ref_name.to_string(), id.clone());
        self.concurrent.push(id);
    }

    fn lookup(&self, commit: &ObjectId, path: &str) -> Option<TreeEntry> {
        let mut tree = self.commit(commit).ok()?.tree;
        let segments: Vec<&str> = path.split('/').collect();
        let (last, dirs) = segments.split_last()?;
        for dir in dirs {
            let entries = self.tree_entries(&tree).ok()?;
            tree = entries.into_iter().find(|e| e.name == *dir)?.object.id;
        }
        self.tree_entries(&tree)
            .ok()?
            .into_iter()
            .find(|e| e.name == *last)
    }
}

fn kind_of(object: &Object) -> ObjectKind {
    match object {
        Object::Blob(_) => ObjectKind::Blob,
        Object::Tree(_) => ObjectKind::Tree,
        Object::Commit(_) => ObjectKind::Commit,
    }
}

impl MockStore {
    /// A store whose `ref_name` points at a root commit containing `files`.
    pub fn with_files(ref_name: &str, files: &[(&str, &[u8], FileMode)]) -> Self {
        let mut inner = Inner::default();
        let mut paths = BTreeMap::new();
        for (path, content, mode) in files {
            let blob = inner.put_blob(content);
            paths.insert((*path).to_string(), (*mode, blob));
        }
        let tree = inner.build_tree(&paths);
        let commit = inner.put_commit(&NewCommit {
            tree,
            parents: Vec::new(),
            author: signature(),
            committer: signature(),
            message: "initial".into(),
        });
        inner.refs.insert(ref_name.to_string(), commit);

        Self {
            inner: RefCell::new(inner),
        }
    }

    /// Advance the ref concurrently before each of the next `times` updates.
    pub fn interfere(&self, times: u32) {
        self.inner.borrow_mut().interference = times;
    }

    /// Fail every ref update with the given error.
    pub fn fail_ref_updates_with(&self, failure: impl Fn() -> StoreError + 'static) {
        self.inner.borrow_mut().fail_update = Some(Box::new(failure));
    }

    pub fn head(&self, ref_name: &str) -> Option<ObjectId> {
        self.inner.borrow().refs.get(ref_name).cloned()
    }

    pub fn commit(&self, id: &ObjectId) -> Option<Commit> {
        self.inner.borrow().commit(id).ok()
    }

    pub fn blob_content(&self, id: &ObjectId) -> Option<Vec<u8>> {
        match self.inner.borrow().objects.get(id) {
            Some(Object::Blob(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// Content of the file at `path` in `commit`.
    pub fn file_at(&self, commit: &ObjectId, path: &str) -> Option<Vec<u8>> {
        let entry = self.inner.borrow().lookup(commit, path)?;
        self.blob_content(&entry.object.id)
    }

    /// Object id of the entry at `path` in `commit`.
    pub fn entry_id(&self, commit: &ObjectId, path: &str) -> Option<ObjectId> {
        self.inner
            .borrow()
            .lookup(commit, path)
            .map(|entry| entry.object.id)
    }

    /// Number of objects written through the store interface.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Number of ref updates attempted.
    pub fn ref_updates(&self) -> usize {
        self.inner.borrow().ref_updates
    }

    /// Commits created by the simulated competing writer, oldest first.
    pub fn concurrent_commits(&self) -> Vec<ObjectId> {
        self.inner.borrow().concurrent.clone()
    }
}

impl ObjectStore for MockStore {
    fn read_ref(&self, name: &str) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        ready(
            self.inner
                .borrow()
                .refs
                .get(name)
                .cloned()
                .ok_or_else(|| StoreError::RefNotFound(name.to_string())),
        )
    }

    fn load_commit(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Commit>> + Send {
        ready(self.inner.borrow().commit(id))
    }

    fn load_tree(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Tree>> + Send {
        ready(
            self.inner
                .borrow()
                .tree_entries(id)
                .map(|entries| Tree::new(id.clone(), entries)),
        )
    }

    fn load_blob(&self, id: &ObjectId) -> impl Future<Output = StoreResult<Vec<u8>>> + Send {
        let result = match self.inner.borrow().objects.get(id) {
            Some(Object::Blob(content)) => Ok(content.clone()),
            Some(other) => Err(StoreError::UnexpectedKind {
                id: id.clone(),
                expected: ObjectKind::Blob,
                actual: kind_of(other),
            }),
            None => Err(StoreError::ObjectNotFound(id.clone())),
        };
        ready(result)
    }

    fn save_blob(&self, content: &[u8]) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        let mut inner = self.inner.borrow_mut();
        inner.writes += 1;
        ready(Ok(inner.put_blob(content)))
    }

    fn create_tree(
        &self,
        base: &ObjectId,
        updates: &[TreeUpdate],
    ) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        let mut inner = self.inner.borrow_mut();
        inner.writes += 1;
        let mut tree = base.clone();
        for update in updates {
            let segments: Vec<&str> = update.path.split('/').filter(|s| !s.is_empty()).collect();
            match inner.replace(Some(&tree), &segments, update.mode, &update.blob) {
                Ok(id) => tree = id,
                Err(err) => return ready(Err(err)),
            }
        }
        ready(Ok(tree))
    }

    fn save_commit(
        &self,
        commit: &NewCommit,
    ) -> impl Future<Output = StoreResult<ObjectId>> + Send {
        let mut inner = self.inner.borrow_mut();
        inner.writes += 1;
        ready(Ok(inner.put_commit(commit)))
    }

    fn update_ref(
        &self,
        name: &str,
        expected: &ObjectId,
        new: &ObjectId,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let mut inner = self.inner.borrow_mut();
        inner.ref_updates += 1;

        if let Some(failure) = &inner.fail_update {
            return ready(Err(failure()));
        }
        if inner.interference > 0 {
            inner.interference -= 1;
            inner.advance_concurrently(name);
        }

        let result = if inner.refs.get(name) == Some(expected) {
            inner.refs.insert(name.to_string(), new.clone());
            Ok(())
        } else {
            Err(StoreError::RefConflict {
                ref_name: name.to_string(),
                expected: expected.clone(),
            })
        };
        ready(result)
    }
}

/// Registry double that records every lookup.
pub struct MockRegistry {
    answer: Result<TagLookup, String>,
    supports: bool,
    queries: RefCell<Vec<(ImageReference, String)>>,
}

impl MockRegistry {
    pub fn answering(answer: Result<TagLookup, RegistryError>) -> Self {
        Self {
            answer: answer.map_err(|err| err.source.to_string()),
            supports: true,
            queries: RefCell::new(Vec::new()),
        }
    }

    pub fn supporting_none(mut self) -> Self {
        self.supports = false;
        self
    }

    pub fn queries(&self) -> Vec<(ImageReference, String)> {
        self.queries.borrow().clone()
    }
}

impl RegistryChecker for MockRegistry {
    fn supports(&self, _image: &ImageReference) -> bool {
        self.supports
    }

    fn tag_exists(
        &self,
        image: &ImageReference,
        tag: &str,
    ) -> impl Future<Output = Result<TagLookup, RegistryError>> + Send {
        self.queries
            .borrow_mut()
            .push((image.clone(), tag.to_string()));
        ready(
            self.answer
                .clone()
                .map_err(|message| RegistryError::new(image.to_string(), message)),
        )
    }
}
