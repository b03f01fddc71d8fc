//! ## smittvakt-telemetry::logging
//! **Structured logging bring-up for scan operations**
//!
//! ### Expectations:
//! - Negligible overhead when the target level is filtered out
//! - One subscriber per process; repeated init calls are no-ops
//!
//! ### Components:
//! - `logging/`: tracing subscriber with env-filter control
//! - `metrics/`: Prometheus exporter with histograms

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Install the global tracing subscriber. Safe to call more than once;
    /// only the first call wins.
    pub fn init() {
        Self::init_with_default("info");
    }

    /// Like [`EventLogger::init`], with a configured fallback level used
    /// when `RUST_LOG` is not set.
    pub fn init_with_default(level: &str) {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(level.to_string())),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init();
    }

    /// Log a detection event with the signature that fired.
    pub fn log_detection(origin: &str, signature: &str) {
        tracing::info!(origin, signature, "Detection event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_detection_logging() {
        EventLogger::log_detection("memory", "Test.Signature-1");
        assert!(logs_contain("Detection event"));
    }
}
