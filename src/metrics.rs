//! Migration metrics and tracing spans
//!
//! Instruments are registered on the global OpenTelemetry meter provider
//! under the meter name `waterline`. Without an installed provider they are
//! no-ops, so the engine records unconditionally.

#[cfg(feature = "metrics")]
pub use self::otel::{MigrationMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use crate::migration::MigrationDirection;
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
        KeyValue,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<MigrationMetrics> = Lazy::new(MigrationMetrics::init);

    pub struct MigrationMetrics {
        pub migrations_total: Counter<u64>,
        pub migration_failures_total: Counter<u64>,
        pub migration_duration: Histogram<f64>,
    }

    impl MigrationMetrics {
        pub fn init() -> Self {
            let meter = global::meter("waterline");

            let migrations_total = meter
                .u64_counter("waterline_migrations_total")
                .with_description("Migrations applied or reverted")
                .build();

            let migration_failures_total = meter
                .u64_counter("waterline_migration_failures_total")
                .with_description("Migrations that failed or could not be recorded")
                .build();

            let migration_duration = meter
                .f64_histogram("waterline_migration_duration_seconds")
                .with_description("Duration of a single migration step")
                .build();

            Self {
                migrations_total,
                migration_failures_total,
                migration_duration,
            }
        }

        pub fn record_success(&self, direction: MigrationDirection, elapsed: Duration) {
            let attributes = [KeyValue::new("direction", direction.as_str())];
            self.migrations_total.add(1, &attributes);
            self.migration_duration.record(elapsed.as_secs_f64(), &attributes);
        }

        pub fn record_failure(&self, direction: MigrationDirection) {
            self.migration_failures_total
                .add(1, &[KeyValue::new("direction", direction.as_str())]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use crate::migration::MigrationDirection;
    use tracing::{info_span, Span};

    /// Span around one migration step
    pub fn migration_span(direction: MigrationDirection, version: u64, description: &str) -> Span {
        info_span!(
            "waterline.migration",
            direction = direction.as_str(),
            version,
            description
        )
    }
}
