use crate::{
    checker::DomainAgeChecker, config::Config, errors::CheckError, metrics, DomainResult,
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub checker: Arc<DomainAgeChecker>,
}

/// Query pairs in request order. Repeated keys are kept so the first
/// `domain` wins instead of failing deserialization.
type QueryPairs = Vec<(String, String)>;

/// Build the HTTP surface around a checker.
pub fn router(checker: Arc<DomainAgeChecker>, config: &Config) -> Router {
    let check_route = if config.cors_enabled {
        get(check_domain).options(preflight)
    } else {
        get(check_domain)
    };

    let mut app = Router::new().route("/check-domain", check_route);

    if config.metrics_enabled {
        app = app.route("/metrics", get(metrics::metrics_handler));
    }

    let app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).into_inner());
    let app = if config.cors_enabled { with_cors_headers(app) } else { app };

    app.with_state(AppState { checker })
}

/// Stamp the CORS headers on every response, preflight or not.
fn with_cors_headers(app: Router<AppState>) -> Router<AppState> {
    app.layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, OPTIONS"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type"),
            ))
            .into_inner(),
    )
}

/// Bind the listener and serve until CTRL+C.
pub async fn serve(config: &Config) -> Result<(), std::io::Error> {
    if config.metrics_enabled {
        metrics::init_metrics();
    }

    let checker = Arc::new(DomainAgeChecker::from_config(config));
    let app = router(checker, config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listener = TcpListener::bind(addr).await?;

    info!("Domain age service listening on {}", addr);
    info!("Check endpoint: http://{}/check-domain?domain=example.com", addr);
    if config.metrics_enabled {
        info!("Metrics: http://{}/metrics", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, gracefully shutting down...");
}

async fn check_domain(
    State(state): State<AppState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<DomainResult>, CheckError> {
    let domain = first_domain(pairs).ok_or(CheckError::MissingParameter)?;

    let start_time = Instant::now();
    metrics::increment_requests(&domain);

    let outcome = state.checker.check(&domain).await;

    if outcome.cached {
        metrics::increment_cache_hits();
    } else {
        metrics::increment_cache_misses();
        metrics::record_lookup_time(start_time.elapsed());
    }
    track_result(&outcome.result);

    Ok(Json(outcome.result))
}

fn first_domain(pairs: QueryPairs) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _)| key == "domain")
        .map(|(_, value)| value)
        .filter(|domain| !domain.is_empty())
}

fn track_result(result: &DomainResult) {
    if result.is_error() {
        metrics::increment_errors(result.error_kind.unwrap_or("other"));
    } else if result.is_recently_registered {
        metrics::increment_recent_domains();
    }
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> QueryPairs {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_first_domain_wins() {
        let query = pairs(&[("x", "1"), ("domain", "a.com"), ("domain", "b.com")]);
        assert_eq!(first_domain(query).as_deref(), Some("a.com"));
    }

    #[test]
    fn test_empty_first_domain_is_missing() {
        assert!(first_domain(pairs(&[("domain", ""), ("domain", "b.com")])).is_none());
        assert!(first_domain(pairs(&[("other", "a.com")])).is_none());
    }
}
