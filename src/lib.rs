use std::borrow::Cow;

use anyhow::Context;

mod adapter_github;
mod adapter_http_server;
mod adapter_release_map;
mod domain;
pub mod tracing;

pub(crate) fn with_env_or(name: &str, default_value: &'static str) -> Cow<'static, str> {
    std::env::var(name)
        .ok()
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed(default_value))
}

pub(crate) fn maybe_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

pub(crate) fn with_env_as_or<T>(name: &str, default_value: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(value) = maybe_env(name) else {
        return Ok(default_value);
    };
    value
        .parse::<T>()
        .with_context(|| format!("unable to parse value from {name:?}"))
}

type Resolver = domain::PoolProxyService<adapter_github::Client, adapter_release_map::Client>;

pub struct Config {
    github: adapter_github::Config,
    http_server: adapter_http_server::Config,
    release_map: adapter_release_map::Config,
    resolver: domain::Config,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            github: adapter_github::Config::from_env()?,
            http_server: adapter_http_server::Config::from_env()?,
            release_map: adapter_release_map::Config::from_env()?,
            resolver: domain::Config::from_env()?,
        })
    }

    pub fn build(self) -> anyhow::Result<Application> {
        let github = self.github.build()?;
        let release_map = self.release_map.build()?;
        let resolver = self.resolver.build(github, release_map);
        Ok(Application {
            http_server: self.http_server.build(resolver)?,
        })
    }
}

pub struct Application {
    http_server: adapter_http_server::Server<Resolver>,
}

impl Application {
    pub async fn run(self) -> anyhow::Result<()> {
        self.http_server.run().await
    }
}
