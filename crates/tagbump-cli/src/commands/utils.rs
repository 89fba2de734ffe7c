use std::path::Path;

use anyhow::{Context, Result, bail};
use tagbump_core::{Config, ImageReference, RegistryChecker, RegistryError, TagLookup};
use tagbump_ecr::{EcrChecker, StaticCredentials};
use tagbump_git::Repository;
use tagbump_github::{Auth, GitHubClient, GitHubStore};
use tokio::runtime::Runtime;

use crate::commands::{PromoteArgs, TargetArgs};
use crate::output;

/// The object store selected on the command line.
pub enum Store {
    GitHub(GitHubStore),
    Local(Repository),
}

/// The registry check selected on the command line.
pub enum Registry {
    Disabled,
    Ecr(EcrChecker),
}

impl RegistryChecker for Registry {
    fn supports(&self, image: &ImageReference) -> bool {
        match self {
            Self::Disabled => false,
            Self::Ecr(checker) => checker.supports(image),
        }
    }

    async fn tag_exists(
        &self,
        image: &ImageReference,
        tag: &str,
    ) -> std::result::Result<TagLookup, RegistryError> {
        match self {
            Self::Disabled => Err(RegistryError::new(image.to_string(), "registry check disabled")),
            Self::Ecr(checker) => checker.tag_exists(image, tag).await,
        }
    }
}

/// Runtime for the store and registry round-trips; every call is awaited in
/// sequence on the calling thread.
pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Load the config file if one was given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    if !path.exists() {
        bail!("Config file not found: {}", path.display());
    }
    Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// `main` → `refs/heads/main`; fully-qualified refs pass through.
pub fn qualified_ref(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("refs/heads/{name}")
    }
}

/// Split `owner/name`.
pub fn split_repository(slug: &str) -> Result<(&str, &str)> {
    match slug.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => bail!("Repository must be given as owner/name, got {slug:?}"),
    }
}

/// Short repository name used in commit subjects.
pub fn repository_name(target: &TargetArgs) -> String {
    if let Some(slug) = &target.repository {
        if let Ok((_, name)) = split_repository(slug) {
            return name.to_string();
        }
    }

    target
        .local_repo
        .as_deref()
        .and_then(|path| path.canonicalize().ok())
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|name| name.trim_end_matches(".git").to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "repository".into())
}

/// Open the object store named by `target`.
pub fn open_store(target: &TargetArgs, config: &Config) -> Result<Store> {
    if let Some(path) = &target.local_repo {
        let repo = Repository::open(path)
            .with_context(|| format!("Failed to open repository at {}", path.display()))?;
        tracing::debug!(?repo, "using local repository");
        return Ok(Store::Local(repo));
    }

    let Some(slug) = &target.repository else {
        bail!("Pass --repository owner/name or --local-repo <path>");
    };
    let (owner, name) = split_repository(slug)?;

    let auth = Auth::token_or_auto(target.token.clone());
    let api_url = target
        .api_url
        .clone()
        .or_else(|| config.github.api_url.clone())
        .unwrap_or_else(|| GitHubClient::DEFAULT_API_URL.to_string());
    let client =
        GitHubClient::with_base_url(&auth, api_url).context("Failed to authenticate with GitHub")?;

    Ok(Store::GitHub(GitHubStore::new(client, owner, name)))
}

/// Build the registry checker; without a repository field there is nothing
/// to check.
pub fn registry(rt: &Runtime, args: &PromoteArgs) -> Result<Registry> {
    if args.repository_field.is_none() {
        return Ok(Registry::Disabled);
    }

    let Some(region) = args.aws_region.as_deref().filter(|r| !r.trim().is_empty()) else {
        output::warn("No AWS region configured; skipping the registry check");
        return Ok(Registry::Disabled);
    };

    let credentials = args
        .aws_access_key_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(StaticCredentials::from_env)
        .transpose()?;

    let checker = rt.block_on(EcrChecker::connect(region, credentials))?;
    Ok(Registry::Ecr(checker))
}
