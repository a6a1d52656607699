//! Request span for the pipeline.

use axum::Router;
use axum::body::Body;
use http::{Request, Response};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

/// Wrap the router in one `http_request` span per request.
///
/// `correlation_id` is filled in by the correlation stage, `status` and
/// `latency_ms` when the response is ready.
pub fn apply_trace_layer<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    version = ?req.version(),
                    correlation_id = Empty,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(
                |res: &Response<Body>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis());
                },
            ),
    )
}
