use crate::listener::{Listener, ListenerHandle, ListenerSpec};
use firelynx_core::error::FirelynxError;
use firelynx_observability::MetricsCollector;
use firelynx_runtime::{AppRegistryHandle, EndpointTable, MiddlewareRegistry, RouteRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

struct Running {
    spec: ListenerSpec,
    listener: Arc<Listener>,
    handle: ListenerHandle,
}

/// Reconciles the desired listener set against what's currently running.
/// Retained listeners (same id, same bind address and options) are left
/// alone — their route table lives in the shared registry and is already
/// current. Changed or removed listeners are drained; added ones are bound
/// fresh. An error binding any added listener aborts the whole reconcile
/// pass and is propagated to the caller, which ends the supervisor's run.
pub struct ListenerSupervisor {
    routes: Arc<RouteRegistry>,
    apps: Arc<AppRegistryHandle>,
    middlewares: Arc<MiddlewareRegistry>,
    metrics: Arc<MetricsCollector>,
    running: HashMap<String, Running>,
}

impl ListenerSupervisor {
    pub fn new(
        routes: Arc<RouteRegistry>,
        apps: Arc<AppRegistryHandle>,
        middlewares: Arc<MiddlewareRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            routes,
            apps,
            middlewares,
            metrics,
            running: HashMap::new(),
        }
    }

    pub fn listener_ids(&self) -> Vec<String> {
        self.running.keys().cloned().collect()
    }

    /// Brings the running set to exactly `desired`, starting from empty.
    pub async fn start(
        &mut self,
        desired: Vec<ListenerSpec>,
        routes: HashMap<String, EndpointTable>,
    ) -> Result<(), FirelynxError> {
        self.reconcile(desired, routes).await
    }

    /// Reconciles the running set against `desired`, then pushes `routes`
    /// through every listener that's still up — including ones just
    /// started — via its own `update_routes`. The registry is shared, so a
    /// single publish would already be visible everywhere; calling through
    /// each listener keeps that method a real, exercised part of the
    /// wrapper's contract rather than dead API surface.
    pub async fn reconcile(
        &mut self,
        desired: Vec<ListenerSpec>,
        routes: HashMap<String, EndpointTable>,
    ) -> Result<(), FirelynxError> {
        let desired_ids: std::collections::HashSet<&str> = desired.iter().map(|s| s.id.as_str()).collect();

        let stale: Vec<String> = self
            .running
            .keys()
            .filter(|id| !desired_ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.stop_one(&id).await;
        }

        for spec in desired {
            match self.running.get(&spec.id) {
                Some(running) if running.spec.address == spec.address && running.spec.options == spec.options => {
                    info!(listener_id = %spec.id, "listener retained across reload");
                    continue;
                }
                Some(_) => {
                    info!(listener_id = %spec.id, "listener configuration changed, rebinding");
                    self.stop_one(&spec.id).await;
                    self.start_one(spec).await?;
                }
                None => {
                    info!(listener_id = %spec.id, "listener added");
                    self.start_one(spec).await?;
                }
            }
        }

        for running in self.running.values() {
            running.listener.update_routes(routes.clone());
        }

        Ok(())
    }

    async fn start_one(&mut self, spec: ListenerSpec) -> Result<(), FirelynxError> {
        let id = spec.id.clone();
        let listener = Arc::new(Listener::new(
            spec.clone(),
            self.routes.clone(),
            self.apps.clone(),
            self.middlewares.clone(),
            self.metrics.clone(),
        ));
        let handle = listener.clone().spawn().await?;
        self.running.insert(id, Running { spec, listener, handle });
        Ok(())
    }

    async fn stop_one(&mut self, id: &str) {
        if let Some(running) = self.running.remove(id) {
            info!(listener_id = %id, "draining listener");
            if let Err(err) = running.handle.stop().await {
                tracing::error!(listener_id = %id, error = %err, "listener did not stop cleanly");
            }
        }
    }

    /// Drains every running listener. Always completes, even if individual
    /// listeners fail to stop cleanly — failures are logged, not propagated,
    /// since shutdown must not get stuck on a single stuck listener.
    pub async fn stop_all(&mut self) {
        let ids: Vec<String> = self.running.keys().cloned().collect();
        for id in ids {
            self.stop_one(&id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firelynx_core::config::ListenerOptions;

    fn spec(id: &str, port: u16) -> ListenerSpec {
        ListenerSpec {
            id: id.to_string(),
            address: format!("127.0.0.1:{port}"),
            endpoint_id: "main".to_string(),
            options: ListenerOptions::default(),
        }
    }

    #[tokio::test]
    async fn reconcile_starts_and_stops_listeners() {
        let routes = Arc::new(RouteRegistry::new());
        let apps = Arc::new(AppRegistryHandle::new(firelynx_runtime::AppRegistry::default()));
        let middlewares = Arc::new(MiddlewareRegistry::new());
        let metrics = Arc::new(MetricsCollector::default());
        let mut supervisor = ListenerSupervisor::new(routes, apps, middlewares, metrics);

        supervisor.start(vec![spec("a", 18080)], HashMap::new()).await.unwrap();
        assert_eq!(supervisor.listener_ids(), vec!["a".to_string()]);

        supervisor.reconcile(vec![spec("b", 18081)], HashMap::new()).await.unwrap();
        assert_eq!(supervisor.listener_ids(), vec!["b".to_string()]);

        supervisor.stop_all().await;
        assert!(supervisor.listener_ids().is_empty());
    }

    #[tokio::test]
    async fn reconcile_pushes_routes_through_retained_listeners() {
        let routes = Arc::new(RouteRegistry::new());
        let apps = Arc::new(AppRegistryHandle::new(firelynx_runtime::AppRegistry::default()));
        let middlewares = Arc::new(MiddlewareRegistry::new());
        let metrics = Arc::new(MetricsCollector::default());
        let mut supervisor = ListenerSupervisor::new(routes.clone(), apps, middlewares, metrics);

        supervisor.start(vec![spec("a", 18082)], HashMap::new()).await.unwrap();
        assert!(!routes.has_endpoint("main"));

        let mut tables = HashMap::new();
        tables.insert(
            "main".to_string(),
            firelynx_runtime::EndpointTable::new(vec![]),
        );
        supervisor.reconcile(vec![spec("a", 18082)], tables).await.unwrap();
        assert!(routes.has_endpoint("main"));

        supervisor.stop_all().await;
    }
}
