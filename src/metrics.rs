use crate::whois;
use axum::{http::StatusCode, response::IntoResponse};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{sync::OnceLock, time::Duration};
use tracing::warn;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);

            // Initialize metrics with zero values
            counter!("domain_age_requests_total", "tld" => "unknown").absolute(0);
            counter!("domain_age_cache_hits_total").absolute(0);
            counter!("domain_age_cache_misses_total").absolute(0);
            counter!("domain_age_errors_total", "error_type" => "unknown").absolute(0);
            counter!("domain_age_recent_domains_total").absolute(0);
        }
        Err(e) => {
            warn!("Failed to install metrics recorder: {}", e);
        }
    }
}

pub fn increment_requests(domain: &str) {
    let tld = tld_label(domain);
    counter!("domain_age_requests_total", "tld" => tld).increment(1);
}

pub fn increment_cache_hits() {
    counter!("domain_age_cache_hits_total").increment(1);
}

pub fn increment_cache_misses() {
    counter!("domain_age_cache_misses_total").increment(1);
}

pub fn increment_errors(error_type: &str) {
    counter!("domain_age_errors_total", "error_type" => error_type.to_string()).increment(1);
}

pub fn increment_recent_domains() {
    counter!("domain_age_recent_domains_total").increment(1);
}

pub fn record_lookup_time(elapsed: Duration) {
    histogram!("domain_age_lookup_duration_seconds").record(elapsed.as_secs_f64());
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized".to_string()),
    }
}

fn tld_label(domain: &str) -> String {
    whois::extract_tld(domain.trim_end_matches('.'))
        .map(|tld| tld.to_lowercase())
        .unwrap_or_else(|_| "unknown".to_string())
}
