//! Validator Oracle
//!
//! Background relay loop plus the admin HTTP interface over the tracked set.

use anyhow::{Context, Result};
use axum::middleware;
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use validator_oracle::{
    api::{self, AppState},
    config::OracleConfig,
    ledger::EthersRelay,
    middleware::request_logging_simple,
    provider::HttpDataProvider,
    scheduler::{OracleStatus, Scheduler},
    store::TrackedSetStore,
    OracleContext,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = OracleConfig::load().context("invalid configuration")?;
    let signing_key = config.signing_key()?;
    info!(
        relayer = ?signing_key.address(),
        contract = ?config.contract_address,
        admin = %config.admin_addr(),
        interval_secs = config.poll_interval_secs,
        "validator oracle starting"
    );

    let store = Arc::new(
        TrackedSetStore::open(&config.tracked_set_path).context("failed to open tracked set")?,
    );
    let provider = Arc::new(
        HttpDataProvider::new(config.provider_endpoints(), config.api_key.expose())
            .context("failed to build data provider client")?,
    );
    let relay = Arc::new(
        EthersRelay::connect(config.relay_settings(), signing_key.wallet())
            .await
            .context("failed to initialise ledger relay")?,
    );
    let ctx = OracleContext::new(store.clone(), provider, relay);
    let status = Arc::new(OracleStatus::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Scheduler::new(
        ctx,
        config.scheduler_settings(),
        status.clone(),
        shutdown_rx.clone(),
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown requested; finishing in-flight relay");
        let _ = shutdown_tx.send(true);
    });

    let app = api::create_router(AppState { store, status })
        .layer(middleware::from_fn(request_logging_simple))
        .layer(CorsLayer::permissive());

    let addr = config.admin_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind admin interface on {addr}"))?;
    info!("admin interface listening on {}", addr);

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("admin server error")?;

    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "scheduler task panicked");
    }
    info!("validator oracle stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "validator_oracle=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents), then the crate root.
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
