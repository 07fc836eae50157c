use crate::StaticData;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A compiled route: its declaration position (for tie-breaking), the
/// path prefix and optional method it matches on, and the data handed to
/// the dispatcher on a hit.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub declaration_order: usize,
    pub path_prefix: String,
    pub method: Option<String>,
    pub app_id: String,
    pub static_data: Arc<StaticData>,
}

/// Per-endpoint compiled routing table: a method filter plus a
/// longest-prefix-wins path matcher. Matching is a linear scan rather than
/// a trie — the declaration-order tiebreak on exact ties is easiest to get
/// right that way, and endpoint route counts are small (tens, not
/// thousands).
#[derive(Debug, Clone, Default)]
pub struct EndpointTable {
    routes: Vec<CompiledRoute>,
}

impl EndpointTable {
    pub fn new(mut routes: Vec<CompiledRoute>) -> Self {
        routes.sort_by_key(|r| r.declaration_order);
        Self { routes }
    }

    /// Longest-prefix match among routes whose method is unset or equals
    /// the request method (case-insensitively). Ties on prefix length go
    /// to whichever route was declared first, which falls out naturally
    /// from scanning in declaration order and only replacing on a
    /// strictly longer prefix.
    pub fn dispatch(&self, method: &str, path: &str) -> Option<&CompiledRoute> {
        let method_upper = method.to_ascii_uppercase();
        let mut best: Option<&CompiledRoute> = None;
        for route in &self.routes {
            let method_matches = route
                .method
                .as_deref()
                .map(|m| m.eq_ignore_ascii_case(&method_upper))
                .unwrap_or(true);
            if !method_matches || !path.starts_with(route.path_prefix.as_str()) {
                continue;
            }
            let replace = match best {
                None => true,
                Some(current) => route.path_prefix.len() > current.path_prefix.len(),
            };
            if replace {
                best = Some(route);
            }
        }
        best
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Snapshot published atomically on every reload: `endpointId -> table`.
/// Dispatch dereferences the swapped pointer once per request and never
/// blocks on a concurrent reload; reload never blocks a dispatch already
/// in flight against the prior snapshot.
pub struct RouteRegistry {
    snapshot: arc_swap::ArcSwap<HashMap<String, EndpointTable>>,
    generation: AtomicU64,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self {
            snapshot: arc_swap::ArcSwap::new(Arc::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, tables: HashMap<String, EndpointTable>) {
        self.snapshot.store(Arc::new(tables));
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Returns `None` when the endpoint itself is unknown (caller should
    /// answer 404), `Some(None)` is not a state this API can express —
    /// callers distinguish "no such endpoint" from "no matching route" by
    /// checking the inner option explicitly via [`RouteRegistry::dispatch`].
    pub fn dispatch(&self, endpoint_id: &str, method: &str, path: &str) -> Option<CompiledRoute> {
        let snapshot = self.snapshot.load();
        snapshot.get(endpoint_id)?.dispatch(method, path).cloned()
    }

    pub fn has_endpoint(&self, endpoint_id: &str) -> bool {
        self.snapshot.load().contains_key(endpoint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(order: usize, prefix: &str, method: Option<&str>) -> CompiledRoute {
        CompiledRoute {
            declaration_order: order,
            path_prefix: prefix.to_string(),
            method: method.map(|m| m.to_string()),
            app_id: format!("app-{order}"),
            static_data: Arc::new(StaticData::new()),
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let table = EndpointTable::new(vec![
            route(0, "/api/v1", None),
            route(1, "/api", None),
        ]);
        assert_eq!(table.dispatch("GET", "/api/v1/x").unwrap().app_id, "app-0");
        assert_eq!(table.dispatch("GET", "/api/other").unwrap().app_id, "app-1");
    }

    #[test]
    fn method_filter_selects_between_equal_prefixes() {
        let table = EndpointTable::new(vec![
            route(0, "/x", Some("GET")),
            route(1, "/x", Some("POST")),
        ]);
        assert_eq!(table.dispatch("GET", "/x").unwrap().app_id, "app-0");
        assert_eq!(table.dispatch("POST", "/x").unwrap().app_id, "app-1");
        assert!(table.dispatch("DELETE", "/x").is_none());
    }

    #[test]
    fn method_matching_is_case_insensitive() {
        let table = EndpointTable::new(vec![route(0, "/x", Some("GET"))]);
        assert!(table.dispatch("get", "/x").is_some());
    }

    #[test]
    fn exact_ties_break_on_declaration_order() {
        let table = EndpointTable::new(vec![
            route(0, "/same", None),
            route(1, "/same", None),
        ]);
        assert_eq!(table.dispatch("GET", "/same").unwrap().app_id, "app-0");
    }

    #[test]
    fn registry_dispatch_is_none_for_unknown_endpoint() {
        let registry = RouteRegistry::new();
        assert!(registry.dispatch("missing", "GET", "/").is_none());
        assert!(!registry.has_endpoint("missing"));
    }

    #[test]
    fn publish_replaces_the_whole_snapshot_and_bumps_generation() {
        let registry = RouteRegistry::new();
        let gen0 = registry.generation();
        let mut tables = HashMap::new();
        tables.insert("main".to_string(), EndpointTable::new(vec![route(0, "/", None)]));
        registry.publish(tables);
        assert!(registry.generation() > gen0);
        assert!(registry.dispatch("main", "GET", "/x").is_some());
    }
}
