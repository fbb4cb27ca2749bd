mod collector;

pub use collector::{CheckMetrics, MetricsRegistry};
