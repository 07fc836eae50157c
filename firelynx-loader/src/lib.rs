pub mod provider;
pub mod watcher;

pub use provider::{ConfigProvider, FileConfigProvider};
pub use watcher::ConfigWatcher;
