use async_trait::async_trait;
use firelynx_core::config::Graph;
use firelynx_core::error::FirelynxError;
use std::path::PathBuf;

/// Source of a config graph. Loading is the only contract — nothing here
/// decides when to reload; that's the core runner's job, driven by a
/// [`crate::watcher::ConfigWatcher`] or an external trigger.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn load(&self) -> Result<Graph, FirelynxError>;
}

/// Reads and parses a single TOML file on every call. No caching —
/// the core runner owns the decision of whether a reload is needed.
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load(&self) -> Result<Graph, FirelynxError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FirelynxError::Parse(format!("reading {:?}: {e}", self.path)))?;
        Graph::parse(&text)
    }
}
