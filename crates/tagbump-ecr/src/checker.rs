//! [`RegistryChecker`] backed by ECR `DescribeImages`.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_ecr::Client;
use aws_sdk_ecr::config::Credentials;
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_sdk_ecr::types::ImageIdentifier;
use secrecy::{ExposeSecret, SecretString};
use tagbump_core::{ImageReference, RegistryChecker, RegistryError, TagLookup};

use crate::error::{Error, Result};
use crate::host::EcrHost;

/// An explicit access key pair.
pub struct StaticCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl StaticCredentials {
    /// Pair `access_key_id` with `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN` from the environment.
    ///
    /// # Errors
    /// Returns [`Error::MissingSecret`] if the secret is not set.
    pub fn from_env(access_key_id: impl Into<String>) -> Result<Self> {
        let secret = std::env::var("AWS_SECRET_ACCESS_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingSecret)?;
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        Ok(Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret),
            session_token,
        })
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

/// Checks tags against the ECR registries of one region.
#[derive(Debug, Clone)]
pub struct EcrChecker {
    client: Client,
    region: String,
}

impl EcrChecker {
    /// Build a checker for `region`, using `credentials` if given and the
    /// default AWS provider chain otherwise.
    ///
    /// # Errors
    /// Returns [`Error::MissingRegion`] if `region` is blank.
    pub async fn connect(region: &str, credentials: Option<StaticCredentials>) -> Result<Self> {
        let region = region.trim();
        if region.is_empty() {
            return Err(Error::MissingRegion);
        }

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(credentials) = credentials {
            tracing::debug!(access_key_id = %credentials.access_key_id, "using static AWS credentials");
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key.expose_secret(),
                credentials
                    .session_token
                    .map(|token| token.expose_secret().to_string()),
                None,
                "tagbump",
            ));
        }

        let sdk_config = loader.load().await;
        Ok(Self::from_client(Client::new(&sdk_config), region))
    }

    /// Wrap an already configured client.
    #[must_use]
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    fn host_of(&self, image: &ImageReference) -> Option<EcrHost> {
        image
            .registry
            .as_deref()
            .and_then(EcrHost::parse)
            .filter(|host| host.region == self.region)
    }
}

impl RegistryChecker for EcrChecker {
    fn supports(&self, image: &ImageReference) -> bool {
        self.host_of(image).is_some()
    }

    async fn tag_exists(
        &self,
        image: &ImageReference,
        tag: &str,
    ) -> std::result::Result<TagLookup, RegistryError> {
        let Some(host) = self.host_of(image) else {
            return Err(RegistryError::new(
                image.to_string(),
                format!("not an ECR registry in {}", self.region),
            ));
        };

        tracing::debug!(registry = %host, repository = %image.repository, %tag, "describing image");
        let response = self
            .client
            .describe_images()
            .registry_id(&host.account)
            .repository_name(&image.repository)
            .image_ids(ImageIdentifier::builder().image_tag(tag).build())
            .send()
            .await;

        match response {
            Ok(output) if output.image_details().is_empty() => Ok(TagLookup::NotFound),
            Ok(_) => Ok(TagLookup::Found),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_image_not_found_exception()) =>
            {
                Ok(TagLookup::NotFound)
            }
            Err(err) => Err(RegistryError::new(
                image.to_string(),
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }
}
