use std::time::{Duration, Instant};

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    Error, HttpResponse,
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "social_hub_http_requests_total",
            "Total HTTP requests handled by social-hub-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create social_hub_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register social_hub_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "social_hub_http_request_duration_seconds",
            "HTTP request latency for social-hub-service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["method", "path", "status"],
    )
    .expect("failed to create social_hub_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register social_hub_http_request_duration_seconds");
    histogram
});

/// Channel pushes by delivery mode (`broadcast`/`targeted`) and outcome
/// (`delivered`/`pruned`/`offline`)
static REALTIME_PUSHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "social_hub_realtime_pushes_total",
            "Real-time channel pushes by mode and outcome",
        ),
        &["mode", "outcome"],
    )
    .expect("failed to create social_hub_realtime_pushes_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register social_hub_realtime_pushes_total");
    counter
});

static WS_CHANNELS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new("social_hub_ws_channels", "Open real-time channels")
        .expect("failed to create social_hub_ws_channels");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register social_hub_ws_channels");
    gauge
});

/// Notification records by kind and dedup decision (`created`/`suppressed`)
static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "social_hub_notifications_total",
            "Notification decisions by kind",
        ),
        &["kind", "decision"],
    )
    .expect("failed to create social_hub_notifications_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register social_hub_notifications_total");
    counter
});

pub fn record_push(mode: &str, outcome: &str, count: usize) {
    if count > 0 {
        REALTIME_PUSHES_TOTAL
            .with_label_values(&[mode, outcome])
            .inc_by(count as u64);
    }
}

pub fn set_ws_channels(count: usize) {
    WS_CHANNELS.set(count as i64);
}

pub fn record_notification(kind: &str, decision: &str) {
    NOTIFICATIONS_TOTAL.with_label_values(&[kind, decision]).inc();
}

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

/// Request counter and latency histogram, labelled by route pattern.
///
/// Installed with `middleware::from_fn(metrics::track_http)`.
pub async fn track_http(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    // unmatched requests fall back to the raw path
    let path = req
        .match_pattern()
        .unwrap_or_else(|| req.path().to_string());
    let method = req.method().to_string();
    let start = Instant::now();

    let result = next.call(req).await;
    let status = match &result {
        Ok(response) => response.status().as_u16(),
        Err(err) => err.as_response_error().status_code().as_u16(),
    };
    observe_http_request(&method, &path, status, start.elapsed());
    result
}
