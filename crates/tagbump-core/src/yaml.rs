//! Multi-document YAML patching.
//!
//! A blob is loaded as an ordered set of documents, one scalar field is
//! rewritten, and every document is emitted again in its original order.

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::field_path::FieldPath;

/// Separator line emitted between consecutive documents.
const DOCUMENT_SEPARATOR: &str = "---\n";

/// Result of writing a new value into a document set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The field already holds the computed value; nothing must be committed.
    NoChange { current: String },
    /// The field was rewritten and the documents re-serialized.
    Applied {
        previous: String,
        current: String,
        content: Vec<u8>,
    },
    /// No document contains the field.
    FieldMissing,
}

/// The ordered documents parsed from one blob.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    documents: Vec<Value>,
}

impl DocumentSet {
    /// Parse every document in `bytes`.
    ///
    /// # Errors
    /// Returns [`Error::YamlParse`] on malformed content.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let documents = serde_yaml::Deserializer::from_slice(bytes)
            .map(|document| Value::deserialize(document).map_err(Error::YamlParse))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { documents })
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The parsed documents in file order.
    #[must_use]
    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    /// Read the scalar at `path` from the first document that contains it.
    ///
    /// # Errors
    /// Returns [`Error::FieldNotFound`] if no document contains the path and
    /// [`Error::FieldNotScalar`] if it addresses a mapping or sequence.
    pub fn get(&self, path: &FieldPath) -> Result<String> {
        let value = self
            .documents
            .iter()
            .find_map(|doc| path.lookup(doc))
            .ok_or_else(|| Error::FieldNotFound(path.to_string()))?;

        scalar_text(value).ok_or_else(|| Error::FieldNotScalar(path.to_string()))
    }

    /// Write `new_version` at `path` in every document containing it.
    ///
    /// A string holding a `repository:tag` pair keeps everything before the
    /// first `:` and only the suffix is replaced.
    ///
    /// # Errors
    /// Returns [`Error::FieldNotScalar`] if the path addresses a mapping or
    /// sequence, or [`Error::YamlEmit`] if re-serialization fails.
    pub fn set(&mut self, path: &FieldPath, new_version: &str) -> Result<PatchOutcome> {
        let mut first: Option<(String, String)> = None;
        let mut changed = false;

        for doc in &mut self.documents {
            let Some(slot) = path.lookup_mut(doc) else {
                continue;
            };
            let previous =
                scalar_text(slot).ok_or_else(|| Error::FieldNotScalar(path.to_string()))?;
            let next = promoted_value(&previous, new_version);

            if next != previous {
                *slot = Value::String(next.clone());
                changed = true;
            }
            first.get_or_insert((previous, next));
        }

        let Some((previous, current)) = first else {
            return Ok(PatchOutcome::FieldMissing);
        };

        if !changed {
            return Ok(PatchOutcome::NoChange { current });
        }

        Ok(PatchOutcome::Applied {
            previous,
            current,
            content: self.to_bytes()?,
        })
    }

    /// Emit all documents, separated by `---` lines.
    ///
    /// Empty documents, such as the one after a trailing `---`, are emitted
    /// with an empty body.
    ///
    /// # Errors
    /// Returns [`Error::YamlEmit`] if a document cannot be serialized.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let rendered = self
            .documents
            .iter()
            .map(|doc| {
                if doc.is_null() {
                    return Ok(String::new());
                }
                let mut text = serde_yaml::to_string(doc).map_err(Error::YamlEmit)?;
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                Ok(text)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(rendered.join(DOCUMENT_SEPARATOR).into_bytes())
    }
}

/// Compute the value written for `new_version` given the stored value.
#[must_use]
pub fn promoted_value(existing: &str, new_version: &str) -> String {
    match existing.split_once(':') {
        Some((repository, _tag)) => format!("{repository}:{new_version}"),
        None => new_version.to_string(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
