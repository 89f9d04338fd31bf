//! Build-host transport: push generated files through the contents API,
//! watch the Actions artifact list, download the finished archive.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use oneclick_client_core::{
    BuildArtifact, BuildDestination, BuildHostApi, BuildHostError, ProjectFileSet,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "oneclick-studio";

#[derive(Default)]
pub struct GithubBuildHost {
    http: Client,
}

impl GithubBuildHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header("user-agent", USER_AGENT)
            .header("accept", "application/vnd.github+json")
            .bearer_auth(token)
    }

    /// Blob sha of an existing file, or `None` when the path is new.
    async fn existing_sha(
        &self,
        destination: &BuildDestination,
        path: &str,
    ) -> Result<Option<String>, BuildHostError> {
        let url = contents_url(&destination.owner, &destination.repo, path);
        let response = self
            .request(self.http.get(url), &destination.token)
            .send()
            .await
            .map_err(|err| BuildHostError::Transport(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value: Value = check(response)
            .await?
            .json()
            .await
            .map_err(|err| BuildHostError::Transport(err.to_string()))?;
        Ok(value.get("sha").and_then(Value::as_str).map(str::to_string))
    }
}

fn contents_url(owner: &str, repo: &str, path: &str) -> String {
    format!("{API_BASE}/repos/{owner}/{repo}/contents/{path}")
}

fn artifacts_url(owner: &str, repo: &str) -> String {
    format!("{API_BASE}/repos/{owner}/{repo}/actions/artifacts?per_page=20")
}

fn actions_page(owner: &str, repo: &str) -> String {
    format!("https://github.com/{owner}/{repo}/actions")
}

fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

/// The newest non-expired artifact created after `pushed_at_ms`.
fn newest_artifact(
    listing: &Value,
    owner: &str,
    repo: &str,
    pushed_at_ms: i64,
) -> Option<BuildArtifact> {
    let artifacts = listing.get("artifacts")?.as_array()?;
    artifacts
        .iter()
        .filter(|a| !a.get("expired").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|a| {
            let created_at = a.get("created_at")?.as_str()?;
            let created: DateTime<Utc> = created_at.parse().ok()?;
            if created.timestamp_millis() <= pushed_at_ms {
                return None;
            }
            let download_url = a.get("archive_download_url")?.as_str()?;
            Some((created, download_url.to_string()))
        })
        .max_by_key(|(created, _)| *created)
        .map(|(_, download_url)| BuildArtifact {
            download_url,
            web_url: actions_page(owner, repo),
        })
}

async fn check(response: Response) -> Result<Response, BuildHostError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(BuildHostError::Rejected(format!("{status}: {body}")))
}

#[async_trait]
impl BuildHostApi for GithubBuildHost {
    async fn push_files(
        &self,
        destination: &BuildDestination,
        files: &ProjectFileSet,
    ) -> Result<(), BuildHostError> {
        for (path, content) in files {
            let sha = self.existing_sha(destination, path).await?;
            let mut body = json!({
                "message": format!("Update {path}"),
                "content": encode_content(content),
            });
            if let (Some(sha), Some(map)) = (sha, body.as_object_mut()) {
                map.insert("sha".to_string(), Value::String(sha));
            }
            let url = contents_url(&destination.owner, &destination.repo, path);
            let response = self
                .request(self.http.put(url), &destination.token)
                .json(&body)
                .send()
                .await
                .map_err(|err| BuildHostError::Transport(err.to_string()))?;
            check(response).await?;
            debug!(path, "pushed file");
        }
        Ok(())
    }

    async fn latest_artifact(
        &self,
        destination: &BuildDestination,
        pushed_at_ms: i64,
    ) -> Result<Option<BuildArtifact>, BuildHostError> {
        let url = artifacts_url(&destination.owner, &destination.repo);
        let response = self
            .request(self.http.get(url), &destination.token)
            .send()
            .await
            .map_err(|err| BuildHostError::Transport(err.to_string()))?;
        let listing: Value = check(response)
            .await?
            .json()
            .await
            .map_err(|err| BuildHostError::Transport(err.to_string()))?;
        Ok(newest_artifact(
            &listing,
            &destination.owner,
            &destination.repo,
            pushed_at_ms,
        ))
    }

    async fn download_artifact(
        &self,
        destination: &BuildDestination,
        artifact: &BuildArtifact,
    ) -> Result<Vec<u8>, BuildHostError> {
        let response = self
            .request(self.http.get(&artifact.download_url), &destination.token)
            .send()
            .await
            .map_err(|err| BuildHostError::Transport(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BuildHostError::ArtifactNotFound);
        }
        let response = check(response).await?;
        let mut stream = response.bytes_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| BuildHostError::Transport(err.to_string()))?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_urls_compose_from_the_destination() {
        assert_eq!(
            contents_url("me", "app", "index.html"),
            "https://api.github.com/repos/me/app/contents/index.html"
        );
        assert_eq!(
            artifacts_url("me", "app"),
            "https://api.github.com/repos/me/app/actions/artifacts?per_page=20"
        );
    }

    #[test]
    fn content_is_base64_encoded() {
        assert_eq!(encode_content("hi"), "aGk=");
    }

    #[test]
    fn newest_artifact_skips_expired_and_stale_entries() {
        let listing = json!({
            "artifacts": [
                {
                    "id": 1,
                    "expired": true,
                    "created_at": "2026-02-01T10:00:00Z",
                    "archive_download_url": "https://api.github.com/a/1/zip"
                },
                {
                    "id": 2,
                    "expired": false,
                    "created_at": "2026-01-01T10:00:00Z",
                    "archive_download_url": "https://api.github.com/a/2/zip"
                },
                {
                    "id": 3,
                    "expired": false,
                    "created_at": "2026-02-01T11:00:00Z",
                    "archive_download_url": "https://api.github.com/a/3/zip"
                }
            ]
        });
        // Pushed at 2026-01-15: the only eligible artifact is id 3.
        let pushed_at_ms = "2026-01-15T00:00:00Z"
            .parse::<DateTime<Utc>>()
            .expect("timestamp")
            .timestamp_millis();
        let artifact = newest_artifact(&listing, "me", "app", pushed_at_ms).expect("artifact");
        assert_eq!(artifact.download_url, "https://api.github.com/a/3/zip");
        assert_eq!(artifact.web_url, "https://github.com/me/app/actions");
    }

    #[test]
    fn empty_listing_yields_no_artifact() {
        assert_eq!(newest_artifact(&json!({ "artifacts": [] }), "me", "app", 0), None);
        assert_eq!(newest_artifact(&json!({}), "me", "app", 0), None);
    }
}
