//! Inbound HTTP surface.
//!
//! - `GET /api/health`: JSON [`HealthReport`].
//! - `GET /api/health/schema`: JSON Schema of that report.
//! - `GET /status`: the same data as an HTML page.

use crate::core::*;
use crate::handler::ent::*;
use crate::handler::page;

use axum::{
    error_handling::HandleErrorLayer,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::{error::Error, future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub dc: Arc<Doctor>,
}

impl AppState {
    async fn report(&self) -> HealthReport {
        let upstream = self.dc.check_upstream().await;
        HealthReport::new(vec![upstream], Utc::now())
    }
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.report().await)
}

async fn health_schema() -> impl IntoResponse {
    Json(schemars::schema_for!(HealthReport))
}

async fn status_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.report().await;
    let endpoint = state.dc.endpoint();
    Html(page::render(
        &report,
        state.dc.last_updated(),
        endpoint.as_deref(),
    ))
}

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/health/schema", get(health_schema))
        .route("/status", get(status_page))
        // Add middleware to all routes
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|error: BoxError| async move {
                    if error.is::<tower::timeout::error::Elapsed>() {
                        Ok(StatusCode::REQUEST_TIMEOUT)
                    } else {
                        Err((
                            StatusCode::INTERNAL_SERVER_ERROR,
                            format!("Unhandled internal error: {}", error),
                        ))
                    }
                }))
                .timeout(request_timeout)
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

/// Serves the router on `addr` until `shutdown` resolves.
pub async fn listen(
    addr: SocketAddr,
    app: Router,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let server = axum::Server::try_bind(&addr)?.serve(app.into_make_service());
    tracing::info!("listening on {}", server.local_addr());
    server.with_graceful_shutdown(shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Upstream;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app() -> Router {
        let dc = Doctor::new(&Upstream::default(), Arc::new(HealthCache::new())).unwrap();
        router(Arc::new(AppState { dc: Arc::new(dc) }), Duration::from_secs(10))
    }

    async fn get_body(uri: &str) -> (StatusCode, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_unconfigured_upstream_as_degraded() {
        let (status, body) = get_body("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["overall"], "degraded");
        assert_eq!(json["pixel"]["name"], "Pixel");
        assert_eq!(json["pixel"]["version"], reported_version());
        assert_eq!(json["pixel"]["status"], "UP");
        assert_eq!(json["services"][0]["name"], "Stash API");
        assert_eq!(json["services"][0]["status"], "UNKNOWN");
        assert_eq!(json["services"][0]["error"], "API URL not configured");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn schema_is_served() {
        let (status, body) = get_body("/api/health/schema").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["title"], "HealthReport");
    }

    #[tokio::test]
    async fn status_page_is_html() {
        let (status, body) = get_body("/status").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains("Partial System Outage"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = get_body("/nodes").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
