//! GitHub Git Data API client.

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::auth::Auth;
use crate::error::{Error, Result};
use crate::types::{
    CreateBlob, CreateCommit, CreateTree, CreatedObject, GitBlob, GitCommit, GitRef, GitTree,
    UpdateRef,
};

/// GitHub API client.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    /// Token stored as `SecretString` for automatic zeroization on drop.
    token: SecretString,
}

impl GitHubClient {
    /// Default GitHub API URL.
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";

    /// Create a new GitHub client.
    ///
    /// # Errors
    /// Returns error if authentication fails.
    pub fn new(auth: &Auth) -> Result<Self> {
        Self::with_base_url(auth, Self::DEFAULT_API_URL)
    }

    /// Create a new GitHub client with a custom API URL (for GitHub Enterprise).
    ///
    /// # Errors
    /// Returns error if authentication fails.
    pub fn with_base_url(auth: &Auth, base_url: impl Into<String>) -> Result<Self> {
        let token = auth.resolve()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("tagbump"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    /// Make a GET request.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make a POST request.
    async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make a PATCH request.
    async fn patch<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "PATCH");
        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, self.bearer())
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        // Handle error responses
        let status_code = status.as_u16();

        match status_code {
            401 => Err(Error::AuthenticationFailed),
            403 if response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|v| v == "0") =>
            {
                Err(Error::RateLimited)
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(Error::ApiError {
                    status: status_code,
                    message: text,
                })
            }
        }
    }

    // === Ref Operations ===

    /// Get a git reference such as `refs/heads/main`.
    ///
    /// # Errors
    /// Returns error if the ref does not exist or the API call fails.
    pub async fn get_ref(&self, owner: &str, repo: &str, ref_name: &str) -> Result<GitRef> {
        self.get(&format!(
            "/repos/{owner}/{repo}/git/ref/{}",
            short_ref(ref_name)
        ))
        .await
    }

    /// Move a git reference to `sha`.
    ///
    /// # Errors
    /// Returns error if the API call fails; a rejected non-forced update that
    /// is not a fast-forward surfaces as a 422 [`Error::ApiError`].
    pub async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        ref_name: &str,
        update: &UpdateRef,
    ) -> Result<GitRef> {
        self.patch(
            &format!("/repos/{owner}/{repo}/git/refs/{}", short_ref(ref_name)),
            update,
        )
        .await
    }

    // === Object Reads ===

    /// Get a commit object.
    ///
    /// # Errors
    /// Returns error if the commit does not exist or the API call fails.
    pub async fn get_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<GitCommit> {
        self.get(&format!("/repos/{owner}/{repo}/git/commits/{sha}"))
            .await
    }

    /// Get a (non-recursive) tree listing.
    ///
    /// # Errors
    /// Returns error if the tree does not exist, the listing is truncated, or
    /// the API call fails.
    pub async fn get_tree(&self, owner: &str, repo: &str, sha: &str) -> Result<GitTree> {
        let tree: GitTree = self
            .get(&format!("/repos/{owner}/{repo}/git/trees/{sha}"))
            .await?;

        if tree.truncated {
            return Err(Error::TruncatedTree(sha.to_string()));
        }
        Ok(tree)
    }

    /// Get a blob object.
    ///
    /// # Errors
    /// Returns error if the blob does not exist or the API call fails.
    pub async fn get_blob(&self, owner: &str, repo: &str, sha: &str) -> Result<GitBlob> {
        self.get(&format!("/repos/{owner}/{repo}/git/blobs/{sha}"))
            .await
    }

    // === Object Writes ===

    /// Create a blob.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn create_blob(
        &self,
        owner: &str,
        repo: &str,
        blob: &CreateBlob,
    ) -> Result<CreatedObject> {
        self.post(&format!("/repos/{owner}/{repo}/git/blobs"), blob)
            .await
    }

    /// Create a tree on top of a base tree.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        tree: &CreateTree,
    ) -> Result<CreatedObject> {
        self.post(&format!("/repos/{owner}/{repo}/git/trees"), tree)
            .await
    }

    /// Create a commit.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        commit: &CreateCommit,
    ) -> Result<CreatedObject> {
        self.post(&format!("/repos/{owner}/{repo}/git/commits"), commit)
            .await
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

/// Strip the `refs/` prefix; the ref endpoints take `heads/main`.
fn short_ref(ref_name: &str) -> &str {
    ref_name.strip_prefix("refs/").unwrap_or(ref_name)
}
