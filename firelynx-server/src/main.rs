mod runner;

use clap::Parser;
use firelynx_admin::{AdminServer, Readiness};
use firelynx_loader::{ConfigWatcher, FileConfigProvider};
use firelynx_observability::{init_tracing, MetricsCollector};
use firelynx_runtime::{AppRegistry, AppRegistryHandle, MiddlewareRegistry, RouteRegistry};
use runner::CoreRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "firelynx", version, about = "Firelynx — declarative HTTP gateway")]
struct Cli {
    /// Path to the TOML config document.
    #[arg(short, long, default_value = "firelynx.toml")]
    config: PathBuf,

    /// Log level, overridden by RUST_LOG when set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit structured JSON logs instead of human-readable text.
    #[arg(long)]
    log_json: bool,

    /// Address the health/readiness/metrics surface binds to.
    #[arg(long, default_value = "127.0.0.1:9090")]
    admin_addr: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), config = %cli.config.display(), "firelynx starting");

    let provider = Arc::new(FileConfigProvider::new(cli.config.clone()));
    let routes = Arc::new(RouteRegistry::new());
    let apps = Arc::new(AppRegistryHandle::new(AppRegistry::default()));
    let middlewares = Arc::new(MiddlewareRegistry::new());
    let metrics = Arc::new(MetricsCollector::default());
    let readiness = Readiness::new();

    let admin = AdminServer::new(cli.admin_addr.clone(), metrics.clone(), readiness.clone());
    let admin_task = tokio::spawn(async move {
        if let Err(err) = admin.run().await {
            error!(error = %err, "admin surface exited");
        }
    });

    let reload_signal = Arc::new(Notify::new());
    let _watcher = match ConfigWatcher::watch(provider.path(), reload_signal.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            error!(error = %err, "failed to watch config file, reload must be triggered externally");
            None
        }
    };

    let mut runner = CoreRunner::new(provider, routes, apps, middlewares, metrics, readiness);

    let result = runner.run(reload_signal, shutdown_signal()).await;

    admin_task.abort();

    result.map_err(Into::into)
}

/// Resolves once either Ctrl+C or SIGTERM is observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
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
