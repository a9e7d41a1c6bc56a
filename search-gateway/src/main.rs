//! Search gateway binary.

use std::future::IntoFuture;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use search_gateway::config::LogFormat;
use search_gateway::http::router;
use search_gateway::{Dependencies, Settings, StartupError};

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    match settings.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Received shutdown signal");
}

async fn run(settings: Settings) -> Result<(), StartupError> {
    let deps = Dependencies::new(&settings).await?;
    let app = router(deps.state, &settings);

    let listener = TcpListener::bind(settings.bind_address()).await?;
    info!(
        address = %settings.bind_address(),
        base_path = %settings.base_path,
        auth = settings.api_secret.is_some(),
        cors = settings.cors.enabled,
        "Search gateway listening"
    );

    let (stopping_tx, stopping_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stopping_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let shutdown_timeout: Duration = settings.shutdown_timeout;
    tokio::select! {
        result = &mut server => result?,
        _ = stopping_rx => {
            // Drain in-flight requests, bounded by the shutdown timeout.
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(
                    timeout_secs = shutdown_timeout.as_secs(),
                    "Shutdown timed out with requests in flight"
                ),
            }
        }
    }

    info!("Search gateway stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&settings);

    if let Err(e) = run(settings).await {
        error!(error = %e, "Search gateway failed");
        std::process::exit(1);
    }
}
