use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub matches_total: IntCounterVec,
    pub requests_in_queue: IntGauge,
    pub matching_latency_seconds: HistogramVec,
    pub settlement_runs_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let matches_total = IntCounterVec::new(
            Opts::new("matches_total", "Match offers by outcome"),
            &["outcome"],
        )
        .expect("valid matches_total metric");

        let requests_in_queue =
            IntGauge::new("requests_in_queue", "Delivery requests waiting for matching")
                .expect("valid requests_in_queue metric");

        let matching_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "matching_latency_seconds",
                "Latency of one matching attempt in seconds",
            ),
            &["outcome"],
        )
        .expect("valid matching_latency_seconds metric");

        let settlement_runs_total = IntCounterVec::new(
            Opts::new("settlement_runs_total", "Settlement batch runs by outcome"),
            &["outcome"],
        )
        .expect("valid settlement_runs_total metric");

        registry
            .register(Box::new(matches_total.clone()))
            .expect("register matches_total");
        registry
            .register(Box::new(requests_in_queue.clone()))
            .expect("register requests_in_queue");
        registry
            .register(Box::new(matching_latency_seconds.clone()))
            .expect("register matching_latency_seconds");
        registry
            .register(Box::new(settlement_runs_total.clone()))
            .expect("register settlement_runs_total");

        Self {
            registry,
            matches_total,
            requests_in_queue,
            matching_latency_seconds,
            settlement_runs_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
