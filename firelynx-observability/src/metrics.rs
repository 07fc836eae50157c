use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Process-wide Prometheus registry plus the handful of series this gateway
/// emits: per-request dispatch outcomes, reload counts/latency, and the
/// current number of bound listeners. Exposed over HTTP by `firelynx-admin`.
pub struct MetricsCollector {
    registry: Registry,
    pub dispatch_total: IntCounterVec,
    pub reload_total: IntCounterVec,
    pub reload_duration: Histogram,
    pub active_listeners: IntGauge,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let dispatch_total = IntCounterVec::new(
            Opts::new("firelynx_dispatch_total", "Total requests dispatched").namespace("firelynx"),
            &["endpoint", "status"],
        )?;

        let reload_total = IntCounterVec::new(
            Opts::new("firelynx_reload_total", "Total config reload attempts").namespace("firelynx"),
            &["outcome"],
        )?;

        let reload_duration = Histogram::with_opts(
            HistogramOpts::new("firelynx_reload_duration_seconds", "Config reload duration")
                .namespace("firelynx")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;

        let active_listeners = IntGauge::new("firelynx_active_listeners", "Currently bound listeners")?;

        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(reload_total.clone()))?;
        registry.register(Box::new(reload_duration.clone()))?;
        registry.register(Box::new(active_listeners.clone()))?;

        Ok(Self {
            registry,
            dispatch_total,
            reload_total,
            reload_duration,
            active_listeners,
        })
    }

    pub fn record_dispatch(&self, endpoint_id: &str, status: u16) {
        self.dispatch_total
            .with_label_values(&[endpoint_id, &status.to_string()])
            .inc();
    }

    pub fn record_reload(&self, outcome: &str, duration_secs: f64) {
        self.reload_total.with_label_values(&[outcome]).inc();
        self.reload_duration.observe(duration_secs);
    }

    pub fn set_active_listeners(&self, count: i64) {
        self.active_listeners.set(count);
    }

    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metrics = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metrics, &mut buffer).unwrap_or_default();
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("metric registration should never fail for a fixed, valid set of series")
    }
}
