//! Container registry verification seam.
//!
//! Before committing, a promotion can ask a registry whether the new tag has
//! been pushed. The answer never blocks the commit: a missing tag and a failed
//! lookup are both reported back as warnings.

use std::fmt;
use std::future::Future;

/// A container image reference such as `123.dkr.ecr.eu-west-1.amazonaws.com/app:v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host, if the reference names one.
    pub registry: Option<String>,
    /// Repository path inside the registry.
    pub repository: String,
    /// Tag, if present.
    pub tag: Option<String>,
}

impl ImageReference {
    /// Parse `[host/]repository[:tag][@digest]`.
    ///
    /// The first component is a host when it contains `.` or `:` or is
    /// `localhost`. Returns `None` for references without a repository.
    #[must_use]
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        let reference = reference.split_once('@').map_or(reference, |(name, _)| name);

        let (registry, remainder) = match reference.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest)
            }
            _ => (None, reference),
        };

        let last_slash = remainder.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match remainder[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&remainder[..split], Some(remainder[split + 1..].to_string()))
            }
            None => (remainder, None),
        };

        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            return None;
        }

        Some(Self {
            registry,
            repository: repository.to_string(),
            tag: tag.filter(|t| !t.is_empty()),
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{registry}/")?;
        }
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        Ok(())
    }
}

/// Answer from a successful registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLookup {
    Found,
    NotFound,
}

/// A registry lookup that failed for a reason other than a missing tag.
#[derive(Debug, thiserror::Error)]
#[error("registry lookup for {image} failed: {source}")]
pub struct RegistryError {
    pub image: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl RegistryError {
    pub fn new(
        image: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            image: image.into(),
            source: source.into(),
        }
    }
}

/// What the registry check reported for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryStatus {
    Found,
    NotFound,
    Failed(String),
}

impl From<std::result::Result<TagLookup, RegistryError>> for RegistryStatus {
    fn from(result: std::result::Result<TagLookup, RegistryError>) -> Self {
        match result {
            Ok(TagLookup::Found) => Self::Found,
            Ok(TagLookup::NotFound) => Self::NotFound,
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

/// Trait for registry existence checks.
pub trait RegistryChecker {
    /// Whether this checker can answer for `image`.
    fn supports(&self, image: &ImageReference) -> bool;

    /// Ask whether `image` has been pushed with `tag`.
    fn tag_exists(
        &self,
        image: &ImageReference,
        tag: &str,
    ) -> impl Future<Output = std::result::Result<TagLookup, RegistryError>> + Send;
}

/// Checker used when no registry is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistry;

impl RegistryChecker for NoRegistry {
    fn supports(&self, _image: &ImageReference) -> bool {
        false
    }

    fn tag_exists(
        &self,
        _image: &ImageReference,
        _tag: &str,
    ) -> impl Future<Output = std::result::Result<TagLookup, RegistryError>> + Send {
        std::future::ready(Ok(TagLookup::NotFound))
    }
}
