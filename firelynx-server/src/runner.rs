use firelynx_admin::Readiness;
use firelynx_core::error::FirelynxError;
use firelynx_core::interpolate::{Interpolate, SystemEnv};
use firelynx_listener::ListenerSupervisor;
use firelynx_loader::ConfigProvider;
use firelynx_observability::MetricsCollector;
use firelynx_runtime::{AppRegistryHandle, MiddlewareRegistry, RouteRegistry};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{error, info};

/// Lifecycle states per the core runner's contract: `initial` until the
/// first reload succeeds, `running` while serving traffic and reacting to
/// further reloads, `stopping` once a shutdown signal has been observed,
/// `stopped` once every listener has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Initial,
    Running,
    Stopping,
    Stopped,
}

pub struct CoreRunner {
    provider: Arc<dyn ConfigProvider>,
    apps: Arc<AppRegistryHandle>,
    middlewares: Arc<MiddlewareRegistry>,
    supervisor: ListenerSupervisor,
    metrics: Arc<MetricsCollector>,
    readiness: Readiness,
    state: RunnerState,
}

impl CoreRunner {
    pub fn new(
        provider: Arc<dyn ConfigProvider>,
        routes: Arc<RouteRegistry>,
        apps: Arc<AppRegistryHandle>,
        middlewares: Arc<MiddlewareRegistry>,
        metrics: Arc<MetricsCollector>,
        readiness: Readiness,
    ) -> Self {
        let supervisor = ListenerSupervisor::new(routes, apps.clone(), middlewares.clone(), metrics.clone());
        Self {
            provider,
            apps,
            middlewares,
            supervisor,
            metrics,
            readiness,
            state: RunnerState::Initial,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Loads, interpolates, validates, and publishes a brand-new
    /// generation. On any failure the previously published generation (if
    /// any) stays live — a bad reload is never allowed to tear down a
    /// healthy gateway.
    pub async fn reload(&mut self) -> Result<(), FirelynxError> {
        let started = Instant::now();
        let result = self.reload_inner().await;
        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(()) => {
                self.metrics.record_reload("ok", elapsed);
                self.readiness.mark_ready();
                if self.state == RunnerState::Initial {
                    self.state = RunnerState::Running;
                }
            }
            Err(err) => {
                self.metrics.record_reload("error", elapsed);
                error!(error = %err, "reload failed, keeping previous generation");
            }
        }
        result
    }

    async fn reload_inner(&mut self) -> Result<(), FirelynxError> {
        let mut graph = self.provider.load().await?;

        let mut issues = Vec::new();
        graph.interpolate(&SystemEnv, &mut issues);
        if !issues.is_empty() {
            return Err(FirelynxError::Interpolation(
                issues.into_iter().map(|i| i.variable).collect(),
            ));
        }

        firelynx_core::validate(&graph)?;

        let runtime = firelynx_adapter::build(&graph)?;
        self.apps.publish(runtime.apps);
        self.middlewares.publish(runtime.middlewares);
        self.supervisor.reconcile(runtime.listeners, runtime.routes).await?;
        self.metrics.set_active_listeners(self.supervisor.listener_ids().len() as i64);

        Ok(())
    }

    /// Drives the runner until `shutdown` resolves, reloading whenever
    /// `reload_signal` is woken. Always drains every listener before
    /// returning, regardless of how it got here.
    pub async fn run(
        &mut self,
        reload_signal: Arc<Notify>,
        shutdown: impl std::future::Future<Output = ()>,
    ) -> Result<(), FirelynxError> {
        self.reload().await?;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = reload_signal.notified() => {
                    info!("reload signal received");
                    let _ = self.reload().await;
                }
                _ = &mut shutdown => {
                    info!("shutdown signal received, draining listeners");
                    self.state = RunnerState::Stopping;
                    break;
                }
            }
        }

        self.supervisor.stop_all().await;
        self.state = RunnerState::Stopped;
        Ok(())
    }
}
