use crate::{FirelynxError, HttpRequest, HttpResponse, StaticData};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// The terminal handler for a matched route. `getApp(id) -> (handler, ok)`
/// and registration happen through [`AppRegistry`]; this trait is the
/// narrow capability every concrete app kind implements.
#[async_trait]
pub trait App: Send + Sync {
    async fn handle_http(
        &self,
        request: &HttpRequest,
        static_data: &StaticData,
    ) -> Result<HttpResponse, FirelynxError>;
}

/// Process-wide mapping from app id to live handler instance for one
/// generation. Rebuilt wholesale on reload, never mutated in place — a
/// plain `HashMap` behind the swapped `Arc` in [`AppRegistryHandle`]
/// suffices because there's no concurrent in-place mutation to guard
/// against.
#[derive(Default, Clone)]
pub struct AppRegistry {
    apps: HashMap<String, Arc<dyn App>>,
}

impl AppRegistry {
    pub fn builder() -> AppRegistryBuilder {
        AppRegistryBuilder::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn App>> {
        self.apps.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[derive(Default)]
pub struct AppRegistryBuilder {
    apps: HashMap<String, Arc<dyn App>>,
}

impl AppRegistryBuilder {
    pub fn register(mut self, id: impl Into<String>, app: Arc<dyn App>) -> Self {
        self.apps.insert(id.into(), app);
        self
    }

    pub fn build(self) -> AppRegistry {
        AppRegistry { apps: self.apps }
    }
}

/// Holds the currently-published [`AppRegistry`], swapped atomically on
/// reload. Readers dereference once per request and never block on an
/// in-flight reload.
pub struct AppRegistryHandle {
    current: arc_swap::ArcSwap<AppRegistry>,
}

impl AppRegistryHandle {
    pub fn new(initial: AppRegistry) -> Self {
        Self {
            current: arc_swap::ArcSwap::new(Arc::new(initial)),
        }
    }

    pub fn publish(&self, next: AppRegistry) {
        self.current.store(Arc::new(next));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn App>> {
        self.current.load().get(id)
    }

    pub fn snapshot(&self) -> arc_swap::Guard<Arc<AppRegistry>> {
        self.current.load()
    }
}

/// Built-in app kinds, pre-registered in every generation regardless of
/// what the config graph declares.
pub mod builtin {
    use super::*;
    use firelynx_core::config::EchoConfig;

    /// Echoes back a configured response body and status, ignoring the
    /// request entirely. Used in the single-HTTP-echo scenario.
    pub struct EchoApp {
        config: EchoConfig,
    }

    impl EchoApp {
        pub fn new(config: EchoConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl App for EchoApp {
        async fn handle_http(
            &self,
            _request: &HttpRequest,
            _static_data: &StaticData,
        ) -> Result<HttpResponse, FirelynxError> {
            let status = http::StatusCode::from_u16(self.config.status)
                .unwrap_or(http::StatusCode::OK);
            let body = bytes::Bytes::copy_from_slice(self.config.response.as_str().as_bytes());
            http::Response::builder()
                .status(status)
                .body(body)
                .map_err(|e| FirelynxError::Handler(e.to_string()))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builtin::EchoApp;
    use firelynx_core::config::EchoConfig;
    use firelynx_core::interpolate::Interpolated;

    #[test]
    fn registry_looks_up_by_id() {
        let registry = AppRegistry::builder()
            .register(
                "e1",
                Arc::new(EchoApp::new(EchoConfig {
                    response: Interpolated::new("hi"),
                    status: 200,
                })),
            )
            .build();
        assert!(registry.get("e1").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn handle_publishes_a_new_generation_atomically() {
        let handle = AppRegistryHandle::new(AppRegistry::default());
        assert!(handle.get("e1").is_none());
        let next = AppRegistry::builder()
            .register(
                "e1",
                Arc::new(EchoApp::new(EchoConfig {
                    response: Interpolated::new("hi"),
                    status: 200,
                })),
            )
            .build();
        handle.publish(next);
        assert!(handle.get("e1").is_some());
    }
}
