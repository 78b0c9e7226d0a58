//! `warden-api`: serves the sales API and its debug endpoints until
//! SIGINT/SIGTERM or an integrity failure, then drains.

use anyhow::Context;
use std::sync::Arc;
use warden_auth::{Auth, KeyStore};
use warden_config::{ConfigLoader, WardenConfig};
use warden_server::{debug_app, Server, ServerConfig, ShutdownSignal};
use warden_telemetry::{init_logging, init_metrics, Metrics};

/// File read when `WARDEN_CONFIG` is unset. Missing is fine.
const DEFAULT_CONFIG_FILE: &str = "warden.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_file =
        std::env::var("WARDEN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

    let config = ConfigLoader::new()
        .with_dotenv()?
        .with_optional_file(&config_file)?
        .with_env_prefix("WARDEN")
        .load()
        .with_context(|| format!("loading configuration from {config_file}"))?;

    init_logging(&config.telemetry.logging).context("initializing logging")?;

    if let Err(err) = run(config).await {
        tracing::error!(error = ?err, "startup failed");
        return Err(err);
    }
    Ok(())
}

async fn run(config: WardenConfig) -> anyhow::Result<()> {
    tracing::info!(
        build = %config.telemetry.build,
        api = %config.web.api_host,
        debug = %config.web.debug_host,
        "starting service"
    );

    if config.telemetry.prometheus {
        init_metrics().context("installing prometheus recorder")?;
    }

    let keys = KeyStore::from_dir(&config.auth.keys_folder).with_context(|| {
        format!("loading keys from {}", config.auth.keys_folder.display())
    })?;
    tracing::info!(keys = keys.len(), active_kid = %config.auth.active_kid, "keys loaded");

    let auth = Arc::new(Auth::new(Arc::new(keys), config.auth.issuer.clone())?);
    let metrics = Arc::new(Metrics::new());
    let shutdown = ShutdownSignal::with_os_signals();

    let debug = Server::new(
        server_config(&config, &config.web.debug_host),
        debug_app(Arc::clone(&metrics), shutdown.clone(), config.telemetry.build.clone()),
    );
    let debug = tokio::spawn(debug.run());

    let api = Server::new(
        server_config(&config, &config.web.api_host),
        warden::api_app(shutdown.clone(), metrics, auth, config.web.write_timeout()),
    );
    let result = api.run().await;

    // The API listener can fail to bind; make sure the debug listener stops too.
    shutdown.trigger();
    match debug.await {
        Ok(Err(err)) => tracing::error!(error = %err, "debug server failed"),
        Err(err) => tracing::error!(error = %err, "debug server task failed"),
        Ok(Ok(())) => {}
    }

    result.context("api server")?;
    tracing::info!("shutdown complete");
    Ok(())
}

fn server_config(config: &WardenConfig, addr: &str) -> ServerConfig {
    ServerConfig::builder()
        .addr(addr)
        .read_timeout(config.web.read_timeout())
        .max_body_bytes(config.web.max_body_bytes)
        .idle_timeout(config.web.idle_timeout())
        .shutdown_timeout(config.web.shutdown_timeout())
        .build()
}
