//! HTTP surface of the gateway
//!
//! Two entry points run the same pipeline: `POST /gml` for JSON clients and
//! a small HTML form (path configurable) for manual testing. Pipeline
//! failures map to 500 with a `{"message": ...}` body; the message carries
//! the failing stage annotation so the caller knows where the flow died.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use common::Secret;
use lockbox_pipeline::{Error as PipelineError, Pipeline, ProvisioningConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tracing::{error, info};

use crate::metrics;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub provisioning: ProvisioningConfig,
    pub metrics: GatewayMetrics,
    pub prometheus: PrometheusHandle,
    /// Recovery timings forwarded to each pipeline run; production uses the
    /// pipeline defaults, tests shrink them.
    pub recovery_grace: Duration,
    pub retry_backoff: Duration,
}

/// Request counters surfaced on /health
#[derive(Clone)]
pub struct GatewayMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Inbound license request, shared by the JSON and form entry points.
#[derive(Deserialize)]
struct LicenseRequest {
    username: String,
    password: Secret<String>,
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(rename = "requestEncKey", default)]
    request_enc_key: String,
}

/// Build the axum router with all routes and shared state.
pub fn build_router(state: AppState, max_connections: usize, ui_path: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/gml", post(gml_handler))
        .route(ui_path, get(ui_page_handler).post(ui_submit_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Run one license request through a fresh pipeline.
async fn run_license_request(
    state: &AppState,
    request: &LicenseRequest,
) -> Result<String, PipelineError> {
    let pipeline = Pipeline::with_timings(
        state.provisioning.clone(),
        state.recovery_grace,
        state.retry_backoff,
    )?;
    pipeline
        .get_license_for_da(
            &request.username,
            request.password.expose(),
            &request.request_id,
            &request.request_enc_key,
        )
        .await
}

fn failing_stage(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::Stage { stage, .. } => stage,
        _ => "unknown",
    }
}

/// POST /gml — JSON in, `{"license": ...}` out.
///
/// The body is parsed by hand rather than through the Json extractor so that
/// malformed input gets the same 500 `{"message": ...}` shape as pipeline
/// failures; clients of this endpoint only understand that shape.
async fn gml_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let trace_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let started = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let request: LicenseRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            metrics::record_request("gml", 500, started.elapsed().as_secs_f64());
            return error_response(&format!("invalid license request: {e}"));
        }
    };

    info!(
        trace_id,
        username = %request.username,
        request_id = %request.request_id,
        "license request received"
    );

    match run_license_request(&state, &request).await {
        Ok(license) => {
            let elapsed = started.elapsed();
            metrics::record_request("gml", 200, elapsed.as_secs_f64());
            info!(trace_id, elapsed_ms = elapsed.as_millis() as u64, "license issued");
            (
                StatusCode::OK,
                axum::Json(serde_json::json!({"license": license})),
            )
                .into_response()
        }
        Err(err) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            metrics::record_request("gml", 500, started.elapsed().as_secs_f64());
            metrics::record_stage_error(failing_stage(&err));
            error!(trace_id, error = %err, "license request failed");
            error_response(&err.to_string())
        }
    }
}

fn error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({"message": message})),
    )
        .into_response()
}

const SAMPLE_REQUEST: &str = r#"{
  "username": "jdoe7",
  "password": "password",
  "requestId": "licenseRequestId1",
  "requestEncKey": ""
}"#;

/// GET on the UI path — a form that posts a raw JSON request document.
async fn ui_page_handler() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>License Gateway</title></head>
<body>
<h1>Request a license</h1>
<form method="post">
<textarea name="request" rows="12" cols="80">{SAMPLE_REQUEST}</textarea>
<br/>
<input type="submit" value="Get License"/>
</form>
</body>
</html>"#
    ))
}

#[derive(Deserialize)]
struct UiForm {
    request: String,
}

/// POST on the UI path — same flow as /gml, rendered as HTML.
async fn ui_submit_handler(
    State(state): State<AppState>,
    axum::extract::Form(form): axum::extract::Form<UiForm>,
) -> Response {
    let started = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let request: LicenseRequest = match serde_json::from_str(&form.request) {
        Ok(request) => request,
        Err(e) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            metrics::record_request("ui", 500, started.elapsed().as_secs_f64());
            return ui_result_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error",
                &format!("invalid license request: {e}"),
            );
        }
    };

    match run_license_request(&state, &request).await {
        Ok(license) => {
            metrics::record_request("ui", 200, started.elapsed().as_secs_f64());
            ui_result_page(StatusCode::OK, "License", &license)
        }
        Err(err) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            metrics::record_request("ui", 500, started.elapsed().as_secs_f64());
            metrics::record_stage_error(failing_stage(&err));
            error!(error = %err, "license request from ui failed");
            ui_result_page(StatusCode::INTERNAL_SERVER_ERROR, "Error", &err.to_string())
        }
    }
}

/// Render the UI result page. Error pages go out as 500 so callers scripting
/// against the form endpoint see the same status contract as /gml.
fn ui_result_page(status: StatusCode, heading: &str, body: &str) -> Response {
    (
        status,
        Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>License Gateway</title></head>
<body>
<h1>{heading}</h1>
<pre>{body}</pre>
<a href="">Back</a>
</body>
</html>"#
        )),
    )
        .into_response()
}

/// Health endpoint: uptime and request counters as JSON.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.metrics.started_at.elapsed().as_secs();
    let requests = state.metrics.requests_total.load(Ordering::Relaxed);
    let errors = state.metrics.errors_total.load(Ordering::Relaxed);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": "healthy",
            "simulator_url": state.provisioning.sim_server_url,
            "uptime_seconds": uptime,
            "requests_served": requests,
            "errors_total": errors,
        })
        .to_string(),
    )
}

/// Prometheus metrics endpoint — text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
