use std::path::PathBuf;

use anyhow::Context;

mod handler;
mod middleware;

const DEFAULT_ADDRESS: std::net::IpAddr = std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 3000;

pub struct Config {
    pub(crate) address: std::net::IpAddr,
    pub(crate) port: u16,
    pub(crate) static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Ok(Self {
            address: crate::with_env_as_or("ADDRESS", DEFAULT_ADDRESS)?,
            port: crate::with_env_as_or("PORT", DEFAULT_PORT)?,
            static_dir: crate::maybe_env("STATIC_DIR").map(PathBuf::from),
        })
    }

    pub fn build<PR>(self, resolver: PR) -> anyhow::Result<Server<PR>> {
        if let Some(dir) = self.static_dir.as_deref() {
            anyhow::ensure!(dir.is_dir(), "static directory {dir:?} does not exist");
        }
        Ok(Server {
            address: std::net::SocketAddr::from((self.address, self.port)),
            static_dir: self.static_dir,
            state: ServerState { resolver },
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServerState<PR> {
    resolver: PR,
}

#[derive(Debug)]
pub struct Server<PR> {
    address: std::net::SocketAddr,
    static_dir: Option<PathBuf>,
    state: ServerState<PR>,
}

impl<PR> Server<PR>
where
    PR: crate::domain::prelude::PackageResolver + Clone,
{
    pub fn router(&self) -> axum::Router {
        handler::build(self.static_dir.as_deref())
            .layer(middleware::tracing::layer())
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.address)
            .await
            .with_context(|| format!("unable to bind {}", self.address))?;
        let app = self.router();
        tracing::info!(address = ?self.address, "starting server");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server crashed")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = ?err, "unable to listen for sigterm");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
