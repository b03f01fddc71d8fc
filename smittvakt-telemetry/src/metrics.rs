//! ## smittvakt-telemetry::metrics
//! **Prometheus exporter with histograms**
//!
//! ### Expectations:
//! - Cheap enough to record per scanned unit
//! - Text exposition compatible with standard Prometheus scraping
//!
//! ### Components:
//! - `files_scanned_total`: units handed to the scan engine
//! - `infected_total`: units with an Infected verdict
//! - `scan_latency_ns`: per-unit wall time spent in the engine

use prometheus::{Counter, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: prometheus::Registry,
    pub files_scanned: prometheus::Counter,
    pub infected: prometheus::Counter,
    pub scan_latency: prometheus::Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let files_scanned =
            Counter::new("smittvakt_files_scanned_total", "Total scanned units").unwrap();
        let infected =
            Counter::new("smittvakt_infected_total", "Units with an Infected verdict").unwrap();

        let scan_latency = Histogram::with_opts(
            HistogramOpts::new("smittvakt_scan_latency_ns", "Per-unit scan engine wall time")
                .buckets(vec![
                    10_000.0,
                    100_000.0,
                    1_000_000.0,
                    10_000_000.0,
                    100_000_000.0,
                ]),
        )
        .unwrap();

        registry.register(Box::new(files_scanned.clone())).unwrap();
        registry.register(Box::new(infected.clone())).unwrap();
        registry.register(Box::new(scan_latency.clone())).unwrap();

        Self {
            registry,
            files_scanned,
            infected,
            scan_latency,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    pub fn inc_files_scanned(&self) {
        self.files_scanned.inc();
    }

    pub fn inc_infected(&self) {
        self.infected.inc();
    }

    pub fn observe_scan_latency_ns(&self, nanos: f64) {
        self.scan_latency.observe(nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_exported() {
        let metrics = MetricsRecorder::new();
        metrics.inc_files_scanned();
        metrics.inc_files_scanned();
        metrics.inc_infected();

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("smittvakt_files_scanned_total 2"));
        assert!(text.contains("smittvakt_infected_total 1"));
    }
}
