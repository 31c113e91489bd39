use std::path::PathBuf;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::domain::entity::{ProxyError, ReleaseMap};

const DEFAULT_PATH: &str = "./release-map.json";

/// Where the release map is read from, on every request.
pub enum Config {
    Remote { url: String },
    File { path: PathBuf },
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        if let Some(url) = crate::maybe_env("RELEASE_MAP_URL") {
            return Ok(Self::Remote { url });
        }
        let path = crate::with_env_or("RELEASE_MAP_PATH", DEFAULT_PATH);
        Ok(Self::File {
            path: PathBuf::from(path.into_owned()),
        })
    }

    pub fn build(self) -> anyhow::Result<Client> {
        let location = match self {
            Self::Remote { url } => {
                let url = reqwest::Url::parse(&url)
                    .with_context(|| format!("invalid release map url {url:?}"))?;
                let mut headers = HeaderMap::new();
                headers.insert("Accept", HeaderValue::from_static("application/json"));
                let client = crate::adapter_github::http_client(headers, "release-map")?;
                tracing::info!(%url, "release map served remotely");
                Location::Remote { client, url }
            }
            Self::File { path } => {
                tracing::info!(path = %path.display(), "release map read from disk");
                Location::File { path }
            }
        };
        Ok(Client { location })
    }
}

#[derive(Clone, Debug)]
enum Location {
    Remote {
        client: reqwest_middleware::ClientWithMiddleware,
        url: reqwest::Url,
    },
    File {
        path: PathBuf,
    },
}

#[derive(Clone, Debug)]
pub struct Client {
    location: Location,
}

impl Client {
    async fn read(&self) -> anyhow::Result<Vec<u8>> {
        match &self.location {
            Location::Remote { client, url } => {
                let res = client
                    .get(url.clone())
                    .send()
                    .await
                    .context("unable to request release map")?;
                let status = res.status();
                if !status.is_success() {
                    anyhow::bail!("release map answered with status {status}");
                }
                let body = res.bytes().await.context("unable to read release map")?;
                Ok(body.to_vec())
            }
            Location::File { path } => tokio::fs::read(path)
                .await
                .with_context(|| format!("unable to read {}", path.display())),
        }
    }
}

impl crate::domain::prelude::ReleaseMapSource for Client {
    #[tracing::instrument(skip(self))]
    async fn release_map(&self) -> Result<ReleaseMap, ProxyError> {
        let content = self.read().await.map_err(|err| {
            tracing::error!(error = ?err, "release map unavailable");
            ProxyError::release_map_unavailable()
        })?;
        let map: ReleaseMap = serde_json::from_slice(&content).map_err(|err| {
            tracing::error!(error = ?err, "unable to parse release map");
            ProxyError::release_map_unavailable()
        })?;
        tracing::debug!(entries = map.packages.len(), "release map loaded");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use crate::domain::prelude::ReleaseMapSource;

    const CONTENT: &str = r#"{
        "packages": {
            "noraneko-alpha_0.2.0-build1_amd64.deb": {
                "release": "v0.2.0",
                "originalAssetName": "noraneko-alpha-0.2.0.deb",
                "poolPath": "main/n/noraneko-alpha/noraneko-alpha_0.2.0-build1_amd64.deb"
            }
        }
    }"#;

    #[tokio::test]
    async fn should_fetch_remote_release_map() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/release-map.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(CONTENT);
            })
            .await;
        let client = super::Config::Remote {
            url: server.url("/release-map.json"),
        }
        .build()
        .unwrap();

        let map = client.release_map().await.unwrap();

        mock.assert_async().await;
        let entry = map.entry("noraneko-alpha_0.2.0-build1_amd64.deb").unwrap();
        assert_eq!(entry.release, "v0.2.0");
    }

    #[tokio::test]
    async fn should_fail_when_remote_release_map_is_missing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/release-map.json");
                then.status(404).body("Not Found");
            })
            .await;
        let client = super::Config::Remote {
            url: server.url("/release-map.json"),
        }
        .build()
        .unwrap();

        let err = client.release_map().await.unwrap_err();

        assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Release map not found");
    }

    #[tokio::test]
    async fn should_read_release_map_from_disk() {
        let dir = std::env::temp_dir().join(format!("debproxy-map-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("release-map.json");
        tokio::fs::write(&path, CONTENT).await.unwrap();
        let client = super::Config::File { path }.build().unwrap();

        let map = client.release_map().await.unwrap();

        assert_eq!(map.packages.len(), 1);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn should_fail_when_release_map_is_invalid() {
        let dir = std::env::temp_dir().join(format!("debproxy-invalid-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("release-map.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let client = super::Config::File { path }.build().unwrap();

        let err = client.release_map().await.unwrap_err();

        assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn should_fail_when_release_map_file_is_missing() {
        let client = super::Config::File {
            path: "/nonexistent/release-map.json".into(),
        }
        .build()
        .unwrap();

        let err = client.release_map().await.unwrap_err();

        assert_eq!(err.message(), "Release map not found");
    }
}
