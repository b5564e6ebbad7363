//! Gatehouse API server binary.
//!
//! Loads the user file, serves the token API and, on Ctrl-C, stops accepting
//! requests and invalidates every live session before exiting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use gatehouse_api::config::ApiConfig;
use gatehouse_core::auth::static_users::STATIC_PROVIDER_ID;
use gatehouse_core::auth::{AuthenticationProvider, ProviderChain, StaticUserProvider};
use gatehouse_core::events::{Listeners, LoggingListener};
use gatehouse_core::SessionService;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server. Anything not given here comes from the
/// environment through [`ApiConfig::from_env`].
#[derive(Parser, Debug)]
#[command(name = "gatehouse_server", about = "Gatehouse token API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind: Option<String>,

    /// YAML user file. Overrides `GATEHOUSE_USERS_FILE`.
    #[arg(long)]
    users_file: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut ApiConfig) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(users_file) = self.users_file {
            config.users_file = users_file;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,gatehouse_api=debug,gatehouse_core=debug")
            }),
        )
        .init();

    let mut config = ApiConfig::from_env();
    Args::parse().apply(&mut config);

    info!(bind_addr = %config.bind_addr, users_file = %config.users_file.display(), "starting gatehouse_server");

    let users = StaticUserProvider::from_file(STATIC_PROVIDER_ID, &config.users_file)?;
    if users.is_empty() {
        warn!("user file defines no users, every login will be refused");
    } else {
        info!(users = users.len(), "loaded user file");
    }

    let providers: Vec<Arc<dyn AuthenticationProvider>> = vec![Arc::new(users)];
    let sessions = Arc::new(
        SessionService::from_config(Arc::new(ProviderChain::new(providers)), &config.session)?
            .with_listeners(Listeners::new(vec![Arc::new(LoggingListener)])),
    );

    let sweeper_ct = CancellationToken::new();
    let sweeper = sessions.spawn_sweeper(&config.session, sweeper_ct.clone());

    let state = gatehouse_api::AppState {
        sessions: sessions.clone(),
    };
    let app = gatehouse_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper_ct.cancel();
    if let Some(handle) = sweeper {
        join_sweeper(handle).await;
    }
    sessions.shutdown();

    result?;

    Ok(())
}

/// Waits for the sweeper task. Returns false if it panicked or was aborted.
async fn join_sweeper(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "session sweeper ended abnormally");
            false
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweeper_panic_is_reported_not_propagated() {
        let handle = tokio::spawn(async { panic!("sweep failed") });
        assert!(!join_sweeper(handle).await);
    }

    #[tokio::test]
    async fn finished_sweeper_joins_cleanly() {
        let handle = tokio::spawn(async {});
        assert!(join_sweeper(handle).await);
    }

    #[test]
    fn flags_override_environment_values() {
        let mut config = ApiConfig::from_lookup(|_| None);
        let args = Args::parse_from(["gatehouse_server", "--bind", "0.0.0.0:9001"]);
        let users_file = config.users_file.clone();
        args.apply(&mut config);
        assert_eq!(config.bind_addr, "0.0.0.0:9001");
        assert_eq!(config.users_file, users_file);
    }
}
