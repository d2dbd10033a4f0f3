use bakery_api::app::{self, AppState};
use bakery_api::config::ServiceConfig;
use bakery_api::model::Artifacts;
use std::env;
use std::error::Error;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = match env::var("BAKERY_CONFIG") {
        Ok(path) => ServiceConfig::from_file(path)?,
        Err(_) => ServiceConfig::from_env()?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("bakery_api={0},tower_http={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        variant = ?config.variant,
        day_mode = ?config.variant.day_mode(),
        "Starting bakery prediction API"
    );

    // a missing model must not stop the server
    let artifacts = match Artifacts::load(&config.model_path, &config.encoder_path) {
        Ok(artifacts) => {
            info!(
                model = %config.model_path.display(),
                menu_items = artifacts.encoder().len(),
                "Model and encoder loaded"
            );
            Some(artifacts)
        }
        Err(e) => {
            warn!(
                error = %e,
                "Model or encoder not found; check the paths and train the model first"
            );
            None
        }
    };

    let state = AppState::new(artifacts, config.service_message.clone());
    let app = app::create_router(state, config.variant, app::cors_layer(&config.cors)?);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
