use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_counter!("spendlog_records_created_total", "Records persisted, by kind");
    metrics::describe_counter!("spendlog_record_queries_total", "Record queries answered");
    metrics::describe_counter!("spendlog_validation_failures_total", "Requests rejected as invalid");
    metrics::describe_counter!("spendlog_storage_failures_total", "Record store operations that failed");
    metrics::describe_histogram!("spendlog_query_result_size", "Records returned per query");
    Ok(handle)
}
