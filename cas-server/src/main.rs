use auth_identity::build_directory;
use auth_ticket::{ServiceRegistry, SloDispatcher, TicketAuthority, TicketStore};
use clap::Parser;
use error_common::{log_error, CasError, Result};
use logger_redacted::RedactedLogger;
use std::{env, path::PathBuf, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{info, warn};

use cas_server::{create_app, AppState, CasConfig};

/// MockCAS HTTP server
#[derive(Parser, Debug)]
#[command(name = "cas-server")]
#[command(about = "Mock CAS single sign-on server with single logout")]
struct Args {
    /// Listen address, overrides `server.listen`
    #[arg(short, long, env = "MOCKCAS_LISTEN")]
    listen: Option<String>,

    /// Configuration file path (defaults to ./mockcas.toml when present)
    #[arg(short, long, env = "MOCKCAS_CONFIG")]
    config: Option<PathBuf>,

    /// URL prefix of the CAS server, derived from the listen address if empty
    #[arg(short, long, env = "MOCKCAS_SERVER_URL_PREFIX")]
    server_url_prefix: Option<String>,

    /// Service URL of the demo client application, derived if empty
    #[arg(short = 'C', long, env = "MOCKCAS_CLIENT_SERVICE_URL")]
    client_service_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = CasConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(prefix) = args.server_url_prefix {
        config.server.server_url_prefix = prefix;
    }
    if let Some(url) = args.client_service_url {
        config.server.client_service_url = url;
    }
    if args.verbose {
        config.logging.default_filter = "cas_server=debug,auth_ticket=debug,auth_identity=debug,tower_http=debug,info".to_string();
    }
    if env::var("MOCKCAS_ENV").is_ok_and(|v| v == "production") {
        config.logging.json = true;
    }

    RedactedLogger::init(&config.logging)
        .map_err(|e| CasError::ConfigError(format!("logging: {e}")))?;

    if let Err(e) = run(config).await {
        log_error("cas-server", &e);
        return Err(e);
    }
    Ok(())
}

async fn run(mut config: CasConfig) -> Result<()> {
    config.server.resolve_urls()?;
    let addr = config.server.listen_addr()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting MockCAS server");
    info!(prefix = %config.server.server_url_prefix, "Using CAS server url prefix");
    info!(service = %config.server.client_service_url, "Using CAS client service url");

    let directory = build_directory(&config.directory)
        .map_err(|e| CasError::DirectoryError(e.to_string()))?;
    info!(directory = directory.name(), "User directory ready");

    let registry = ServiceRegistry::new(config.services.clone())
        .map_err(|e| CasError::ConfigError(e.to_string()))?;
    info!(services = registry.len(), "Service registry loaded");

    let dispatcher = SloDispatcher::spawn(&config.slo)
        .map_err(|e| CasError::InternalError(format!("single logout dispatcher: {e}")))?;
    if config.slo.default_logout_url.is_none() {
        warn!("No slo.default_logout_url; services without logout_url get no single logout");
    }

    let authority = Arc::new(TicketAuthority::new(
        Arc::new(TicketStore::new(&config.tickets)),
        directory,
        Arc::new(registry),
        Arc::new(dispatcher),
    ));
    spawn_purge_sweeper(authority.clone(), config.server.purge_interval_secs);

    let state = AppState::new(authority, config.server.clone())?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CasError::NetworkError(format!("Failed to bind to {addr}: {e}")))?;
    info!(addr = %addr, "MockCAS server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CasError::ServerError(format!("HTTP server error: {e}")))?;

    warn!("Service shutting down");
    Ok(())
}

fn spawn_purge_sweeper(authority: Arc<TicketAuthority>, interval_secs: u64) {
    let period = Duration::from_secs(interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            authority.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }
}
