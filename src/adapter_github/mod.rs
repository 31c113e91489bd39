use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};

pub(crate) mod entity;
mod method;
pub(crate) mod middleware;
mod releases;

const DEFAULT_OWNER: &str = "f3liz-dev";
const DEFAULT_NAME: &str = "noraneko";
const DEFAULT_USER_AGENT: &str = "noraneko-apt-repo/1.0";

pub struct Config {
    pub(crate) base_url: Cow<'static, str>,
    pub(crate) repository: entity::Repository,
    pub(crate) token: Option<String>,
    pub(crate) user_agent: Cow<'static, str>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            base_url: crate::with_env_or("GITHUB_BASE_URL", "https://api.github.com"),
            repository: crate::with_env_as_or(
                "GITHUB_REPO",
                entity::Repository::new(DEFAULT_OWNER, DEFAULT_NAME),
            )?,
            token: crate::maybe_env("GITHUB_TOKEN"),
            user_agent: crate::with_env_or("GITHUB_USER_AGENT", DEFAULT_USER_AGENT),
        })
    }

    pub fn build(self) -> anyhow::Result<Client> {
        let base_url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid github base url {:?}", self.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("invalid github base url {:?}", self.base_url);
        }
        let user_agent = HeaderValue::from_str(&self.user_agent).context("invalid user agent")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Accept",
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("invalid github token")?;
            value.set_sensitive(true);
            headers.insert("Authorization", value);
        } else {
            tracing::warn!("no github token configured, api calls will be rate limited");
        }
        headers.insert("User-Agent", user_agent.clone());
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let api = http_client(headers, "github")?;

        // Download urls are public and must never receive the token.
        let mut headers = HeaderMap::new();
        headers.insert("User-Agent", user_agent);
        let download = http_client(headers, "github-download")?;

        tracing::info!(repository = %self.repository, "github client ready");
        Ok(Client {
            base_url: Arc::new(base_url),
            repository: Arc::new(self.repository),
            api,
            download,
        })
    }
}

/// Builds a traced client. No retry and no total timeout: downloads can be long.
pub(crate) fn http_client(
    headers: HeaderMap,
    peer_service: &'static str,
) -> anyhow::Result<reqwest_middleware::ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(std::time::Duration::from_secs(10))
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .build()?;
    Ok(reqwest_middleware::ClientBuilder::new(client)
        .with(middleware::TracingMiddleware::new(peer_service))
        .build())
}

#[derive(Clone, Debug)]
pub struct Client {
    base_url: Arc<reqwest::Url>,
    repository: Arc<entity::Repository>,
    api: reqwest_middleware::ClientWithMiddleware,
    download: reqwest_middleware::ClientWithMiddleware,
}
