use crate::interpolate::{EnvLookup, Interpolate, Interpolated, InterpolationIssue};
use serde::{Deserialize, Serialize};

/// Free-form per-route payload handed to the app on every invocation,
/// untouched by the dispatcher.
pub type StaticData = serde_json::Map<String, serde_json::Value>;

/// The `http` route-condition variant — the only one that participates in
/// HTTP dispatch. Other condition tags are preserved on [`RouteDef`] (via
/// its `other_conditions` map) but ignored by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpCondition {
    pub path_prefix: Interpolated,
    #[serde(default)]
    pub method: Option<String>,
}

/// A route: a condition plus the app it dispatches to. The condition is
/// modeled as a closed sum type at the tag level (`http` vs. anything
/// else); TOML has no native tagged-union syntax, so non-`http` tags are
/// captured structurally in `other_conditions` rather than being typed —
/// the routing layer only ever looks at `http`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDef {
    pub app_id: String,
    #[serde(default)]
    pub http: Option<HttpCondition>,
    #[serde(default)]
    pub static_data: StaticData,
    #[serde(flatten)]
    pub other_conditions: serde_json::Map<String, serde_json::Value>,
}

impl Interpolate for HttpCondition {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        self.path_prefix.interpolate(env, errors);
    }
}

impl Interpolate for RouteDef {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        self.http.interpolate(env, errors);
    }
}
