// src/metrics/collector.rs
use anyhow::{Context, Result};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<CheckMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(CheckMetrics::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<CheckMetrics> {
        self.collector.clone()
    }

    /// Render every registered metric in the text exposition format.
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
    }
}

/// Per-check run metrics, labelled by check name.
pub struct CheckMetrics {
    pub runs_total: IntCounterVec,
    pub run_duration_seconds: HistogramVec,
    pub status: IntGaugeVec,
}

impl CheckMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let runs_total = IntCounterVec::new(
            Opts::new("healthcheck_runs_total", "Total completed check runs"),
            &["check", "outcome"],
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        let run_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "healthcheck_run_duration_seconds",
                "Check run duration in seconds",
            ),
            &["check"],
        )?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        let status = IntGaugeVec::new(
            Opts::new(
                "healthcheck_status",
                "Latest check outcome (1=healthy, 0=unhealthy)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(status.clone()))?;

        Ok(Self {
            runs_total,
            run_duration_seconds,
            status,
        })
    }

    pub fn record_run(&self, check: &str, healthy: bool, duration: Duration) {
        let outcome = if healthy { "healthy" } else { "unhealthy" };
        self.runs_total.with_label_values(&[check, outcome]).inc();

        self.run_duration_seconds
            .with_label_values(&[check])
            .observe(duration.as_secs_f64());

        self.status
            .with_label_values(&[check])
            .set(if healthy { 1 } else { 0 });
    }
}
