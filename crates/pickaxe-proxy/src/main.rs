mod config;
mod connection;
mod relay;
mod routes;

use config::ProxyConfig;
use routes::Routes;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Pickaxe proxy...");

    let config = ProxyConfig::load(Path::new("config/proxy.toml"))?;
    info!(
        "Config loaded: bind={}:{}, backend={} (protocol {}), debug={}",
        config.bind, config.port, config.backend, config.backend_protocol, config.pipeline.debug
    );

    let routes = Arc::new(Routes::build(&config)?);
    let pipeline_config = Arc::new(config.pipeline.clone());

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = accept_loop(listener, config.backend.clone(), routes, pipeline_config) => {
            error!("Accept loop exited unexpectedly");
        }
    }

    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    backend: String,
    routes: Arc<Routes>,
    pipeline_config: Arc<pickaxe_protocol_core::PipelineConfig>,
) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("New connection from {}", peer);
                let backend = backend.clone();
                let routes = routes.clone();
                let pipeline_config = pipeline_config.clone();
                tokio::spawn(async move {
                    relay::handle_connection(socket, peer, backend, routes, pipeline_config).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
