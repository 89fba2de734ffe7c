//! Configuration management for tagbump.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::transaction::CommitIdentity;

/// Settings loaded from an optional TOML file; command-line flags override them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Commit identity and message settings.
    #[serde(default)]
    pub commit: CommitConfig,

    /// Conflict retry settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// GitHub-specific settings.
    #[serde(default)]
    pub github: GitHubConfig,
}

impl Config {
    /// Load config from a TOML file, falling back to defaults if it is absent.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Commit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// Name used in the commit subject instead of the repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_name: Option<String>,
}

impl CommitConfig {
    #[must_use]
    pub fn identity(&self) -> CommitIdentity {
        CommitIdentity {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
        }
    }
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
            message_name: None,
        }
    }
}

fn default_author_name() -> String {
    CommitIdentity::default().name
}

fn default_author_email() -> String {
    CommitIdentity::default().email
}

/// Retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts when the ref moves concurrently.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl RetryConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_millis(self.delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

const fn default_attempts() -> u32 {
    2
}

const fn default_delay_ms() -> u64 {
    1000
}

/// GitHub-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitHubConfig {
    /// Custom API URL for GitHub Enterprise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}
