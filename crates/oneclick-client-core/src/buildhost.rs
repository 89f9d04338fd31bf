//! Contract with the external build host that turns the generated files into
//! a downloadable mobile-app artifact.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::project::ProjectFileSet;

/// Credentials and target repository for CI builds. Persisted locally on the
/// device via a [`DestinationStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDestination {
    pub token: String,
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DestinationInputError {
    #[error("access token must not be empty")]
    EmptyToken,
    #[error("repository owner must not be empty")]
    EmptyOwner,
    #[error("repository name must not be empty")]
    EmptyRepo,
}

impl BuildDestination {
    pub fn validated(
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Self, DestinationInputError> {
        let token = token.trim();
        let owner = owner.trim();
        let repo = repo.trim();
        if token.is_empty() {
            return Err(DestinationInputError::EmptyToken);
        }
        if owner.is_empty() {
            return Err(DestinationInputError::EmptyOwner);
        }
        if repo.is_empty() {
            return Err(DestinationInputError::EmptyRepo);
        }
        Ok(Self {
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty()
            && !self.owner.trim().is_empty()
            && !self.repo.trim().is_empty()
    }
}

/// Local persistence for the build destination, mirroring how auth state is
/// kept on the device.
pub trait DestinationStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_destination(&self) -> Result<Option<BuildDestination>, Self::Error>;
    fn persist_destination(&self, destination: &BuildDestination) -> Result<(), Self::Error>;
    fn clear_destination(&self) -> Result<(), Self::Error>;
}

/// A finished build the host offers for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    /// Archive endpoint; requires token auth.
    pub download_url: String,
    /// Human-facing page for the run.
    pub web_url: String,
}

#[derive(Debug, Error)]
pub enum BuildHostError {
    #[error("build host rejected request: {0}")]
    Rejected(String),
    #[error("artifact not found")]
    ArtifactNotFound,
    #[error("build host transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait BuildHostApi: Send + Sync {
    /// Pushes the full file set to the destination repository, which triggers
    /// the host's CI pipeline.
    async fn push_files(
        &self,
        destination: &BuildDestination,
        files: &ProjectFileSet,
    ) -> Result<(), BuildHostError>;

    /// Most recent artifact produced after `pushed_at_ms`, if the build has
    /// finished.
    async fn latest_artifact(
        &self,
        destination: &BuildDestination,
        pushed_at_ms: i64,
    ) -> Result<Option<BuildArtifact>, BuildHostError>;

    /// Downloads the artifact archive. Needs the destination token because
    /// the archive endpoint is authenticated.
    async fn download_artifact(
        &self,
        destination: &BuildDestination,
        artifact: &BuildArtifact,
    ) -> Result<Vec<u8>, BuildHostError>;
}
