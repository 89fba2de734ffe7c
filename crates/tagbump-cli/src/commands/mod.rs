//! CLI command definitions and implementations.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod get;
pub mod promote;
pub mod utils;

/// tagbump - promote an image tag in a GitOps repository with
/// conflict-safe commits.
#[derive(Debug, Parser)]
#[command(name = "tagbump", version, about, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log debug details to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with commit, retry and GitHub settings.
    #[arg(long, global = true, env = "TAGBUMP_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Set a field to a new version, commit and advance the branch.
    Promote(PromoteArgs),

    /// Print the current value of a field.
    Get(TargetArgs),
}

/// Where the manifest lives and which field to address.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// GitHub repository as `owner/name`.
    #[arg(long, env = "TAGBUMP_REPOSITORY", required_unless_present = "local_repo")]
    pub repository: Option<String>,

    /// Work on a local repository instead of GitHub.
    #[arg(long, env = "TAGBUMP_LOCAL_REPO", conflicts_with = "repository")]
    pub local_repo: Option<PathBuf>,

    /// GitHub token (falls back to `gh auth token`).
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Branch or fully-qualified ref to update.
    #[arg(long = "ref", env = "TAGBUMP_REF", default_value = "refs/heads/master")]
    pub git_ref: String,

    /// Path of the YAML file inside the repository.
    #[arg(long, env = "TAGBUMP_PATH")]
    pub path: String,

    /// Dotted path of the field, e.g. `image.tag`.
    #[arg(long, env = "TAGBUMP_FIELD")]
    pub field: String,

    /// GitHub API base URL, for GitHub Enterprise.
    #[arg(long, env = "TAGBUMP_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct PromoteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Version to write into the field.
    #[arg(long, env = "TAGBUMP_NEW_VERSION")]
    pub new_version: String,

    /// Dotted path of the image repository, enabling the registry check.
    #[arg(long, env = "TAGBUMP_REPOSITORY_FIELD")]
    pub repository_field: Option<String>,

    /// Name used in the commit subject (defaults to the repository name).
    #[arg(long, env = "TAGBUMP_MESSAGE_NAME")]
    pub message_name: Option<String>,

    /// Attempts before giving up on ref conflicts.
    #[arg(long, env = "TAGBUMP_RETRY_COUNT")]
    pub retry_count: Option<u32>,

    /// Delay between attempts, in milliseconds.
    #[arg(long, env = "TAGBUMP_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// AWS region of the ECR registry.
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// AWS access key id; the secret is read from `AWS_SECRET_ACCESS_KEY`.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,
}
