use crate::interpolate::{EnvLookup, Interpolate, Interpolated, InterpolationIssue};
use crate::route::RouteDef;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The only version this build accepts. Unknown versions fail validation.
pub const SUPPORTED_VERSION: &str = "v1";

/// Root of the immutable, validated configuration graph. Constructed by a
/// loader, interpolated and validated in one pass, then handed to the core
/// runner — from that point on it is never mutated in place; a change
/// produces a brand-new `Graph` and goes through the reload pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub version: String,
    #[serde(default)]
    pub listeners: Vec<ListenerDef>,
    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
    #[serde(default)]
    pub apps: Vec<AppDef>,
}

impl Graph {
    pub fn parse(text: &str) -> Result<Self, crate::error::FirelynxError> {
        toml::from_str(text).map_err(|e| crate::error::FirelynxError::Parse(e.to_string()))
    }

    pub fn serialize(&self) -> Result<String, crate::error::FirelynxError> {
        toml::to_string_pretty(self).map_err(|e| crate::error::FirelynxError::Parse(e.to_string()))
    }
}

impl Interpolate for Graph {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        self.listeners.interpolate(env, errors);
        self.endpoints.interpolate(env, errors);
        self.apps.interpolate(env, errors);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerType {
    Http,
}

/// `{ id, address, type, options }`. `id` is immutable for the graph's
/// lifetime; `address` is `"host:port"`. Non-HTTP listener kinds have been
/// retired — validation rejects anything but `http`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerDef {
    pub id: String,
    pub address: Interpolated,
    #[serde(rename = "type")]
    pub kind: ListenerType,
    #[serde(default)]
    pub options: ListenerOptions,
}

impl Interpolate for ListenerDef {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        self.address.interpolate(env, errors);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListenerOptions {
    #[serde(with = "humantime_serde", default = "default_read_timeout")]
    pub read_timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_write_timeout")]
    pub write_timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_idle_timeout")]
    pub idle_timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_drain_timeout")]
    pub drain_timeout: Duration,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            read_timeout: default_read_timeout(),
            write_timeout: default_write_timeout(),
            idle_timeout: default_idle_timeout(),
            drain_timeout: default_drain_timeout(),
        }
    }
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_write_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_idle_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_drain_timeout() -> Duration {
    Duration::from_secs(30)
}

/// `{ id, listenerID, routes, middlewares }`. Each listener is owned by at
/// most one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDef {
    pub id: String,
    pub listener_id: String,
    #[serde(default)]
    pub routes: Vec<RouteDef>,
    #[serde(default)]
    pub middlewares: Vec<MiddlewareDef>,
}

impl Interpolate for EndpointDef {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        self.routes.interpolate(env, errors);
        self.middlewares.interpolate(env, errors);
    }
}

/// `{ id, kind, kindSpecificConfig }`. `kind` selects a constructor from a
/// registered table (`echo`, script-runner, …). The kind-specific block is
/// kept as a JSON value here; adapter time is when it's validated against a
/// concrete shape and turned into a live handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl AppDef {
    /// The kind-named sub-table, e.g. `config["echo"]` for `kind == "echo"`.
    pub fn kind_config(&self) -> Option<&serde_json::Value> {
        self.config.get(&self.kind)
    }

    pub fn as_echo_config(&self) -> Option<Result<EchoConfig, serde_json::Error>> {
        if self.kind != "echo" {
            return None;
        }
        Some(
            self.kind_config()
                .map(|v| serde_json::from_value(v.clone()))
                .unwrap_or_else(|| Ok(EchoConfig::default())),
        )
    }
}

impl Interpolate for AppDef {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        // The kind-specific block has no statically known per-field opt-in
        // metadata, so the whole block is the opt-in unit: every string
        // value inside it is expanded.
        for value in self.config.values_mut() {
            crate::interpolate::interpolate_json(value, env, errors);
        }
    }
}

/// `{ id, kind, kindSpecificConfig }`. Kinds include at least `headers` and
/// `console_logger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareDef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl MiddlewareDef {
    pub fn kind_config(&self) -> Option<&serde_json::Value> {
        self.config.get(&self.kind)
    }

    /// Deserializes and interpolates the `headers` block, if this
    /// middleware's kind is `headers`.
    pub fn as_headers_config(&self) -> Option<Result<HeadersConfig, serde_json::Error>> {
        if self.kind != "headers" {
            return None;
        }
        self.kind_config()
            .map(|v| serde_json::from_value(v.clone()))
    }

    pub fn as_console_logger_config(&self) -> Option<Result<ConsoleLoggerConfig, serde_json::Error>> {
        if self.kind != "console_logger" {
            return None;
        }
        self.kind_config()
            .map(|v| serde_json::from_value(v.clone()))
    }
}

impl Interpolate for MiddlewareDef {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        for value in self.config.values_mut() {
            crate::interpolate::interpolate_json(value, env, errors);
        }
    }
}

/// A single name/value pair used by `headers.set` and `headers.add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderKv {
    pub name: String,
    pub value: Interpolated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderOps {
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub set: Vec<HeaderKv>,
    #[serde(default)]
    pub add: Vec<HeaderKv>,
}

/// Kind-specific config for the `headers` middleware: request/response
/// header ops applied in fixed order `remove → set → add`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadersConfig {
    #[serde(default)]
    pub request: HeaderOps,
    #[serde(default)]
    pub response: HeaderOps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerPreset {
    Minimal,
    #[default]
    Standard,
    Detailed,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Per-field overrides layered on top of a [`LoggerPreset`]; `None` means
/// "use whatever the preset says".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoggerFieldToggles {
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub latency: Option<bool>,
    #[serde(default)]
    pub headers: Option<bool>,
    #[serde(default)]
    pub query: Option<bool>,
    #[serde(default)]
    pub request_body: Option<bool>,
    #[serde(default)]
    pub response_body: Option<bool>,
    #[serde(default)]
    pub remote_addr: Option<bool>,
}

/// Kind-specific config for the `console_logger` middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleLoggerConfig {
    #[serde(default)]
    pub preset: LoggerPreset,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub fields: LoggerFieldToggles,
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    #[serde(default)]
    pub include_methods: Vec<String>,
    #[serde(default)]
    pub exclude_methods: Vec<String>,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self {
            preset: LoggerPreset::default(),
            format: LogFormat::default(),
            fields: LoggerFieldToggles::default(),
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            include_methods: Vec::new(),
            exclude_methods: Vec::new(),
            max_body_size: default_max_body_size(),
        }
    }
}

fn default_max_body_size() -> usize {
    4096
}

/// Kind-specific config for the built-in `echo` app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoConfig {
    #[serde(default)]
    pub response: Interpolated,
    #[serde(default = "default_echo_status")]
    pub status: u16,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            response: Interpolated::new(""),
            status: default_echo_status(),
        }
    }
}

fn default_echo_status() -> u16 {
    200
}
