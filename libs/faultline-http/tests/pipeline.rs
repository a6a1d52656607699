#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Drives the full pipeline (trace -> correlation -> exception handling -> router)
//! through `tower::ServiceExt::oneshot`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{HeaderMap, Request, StatusCode, header::CONTENT_TYPE},
    routing::get,
};
use faultline_errors::{
    APPLICATION_PROBLEM_JSON, Failure, ProblemConverter, ProblemDocument, RequestContext,
};
use faultline_http::{
    CurrentCorrelationId, Environment, PipelineConfig, apply_pipeline,
    apply_pipeline_with_converter,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use tracing_test::traced_test;

const GENERIC_DETAIL: &str = "An unexpected error occurred. Please try again later.";

async fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn missing(Path(id): Path<i64>) -> Result<Json<Value>, Failure> {
    Err(Failure::not_found("Product", id))
}

async fn invalid() -> Result<Json<Value>, Failure> {
    let mut errors = BTreeMap::new();
    errors.insert("name".to_owned(), vec!["Product name is required".to_owned()]);
    errors.insert("price".to_owned(), vec!["Price must be greater than 0".to_owned()]);
    Err(Failure::validation(errors))
}

async fn application() -> Result<Json<Value>, Failure> {
    Err(Failure::application_with_cause(
        "upstream rejected the order",
        std::io::Error::other("socket closed"),
        StatusCode::BAD_GATEWAY,
    ))
}

async fn unclassified() -> Result<Json<Value>, Failure> {
    let n: i32 = "not-a-number".parse()?;
    Ok(Json(json!({ "n": n })))
}

async fn panics() -> Json<Value> {
    let items: Vec<u8> = Vec::new();
    let idx = items.len() + 3;
    Json(json!({ "item": items[idx] }))
}

async fn nested_not_found() -> Result<Json<Value>, Failure> {
    tokio::spawn(async {
        tokio::task::yield_now().await;
        Err::<(), _>(Failure::not_found("Order", "o-9"))
    })
    .await??;
    Ok(Json(json!({})))
}

async fn nested_panic() -> Result<Json<Value>, Failure> {
    let slot = tokio::spawn(async {
        tokio::task::yield_now().await;
        let slots: Vec<u8> = Vec::new();
        slots[usize::from(slots.is_empty())]
    })
    .await?;
    Ok(Json(json!({ "slot": slot })))
}

async fn correlation(CurrentCorrelationId(id): CurrentCorrelationId) -> Json<Value> {
    Json(json!({ "correlationId": id }))
}

fn routes() -> Router {
    Router::new()
        .route("/ok", get(ok))
        .route("/api/products/{id}", get(missing))
        .route("/invalid", get(invalid))
        .route("/application", get(application))
        .route("/unclassified", get(unclassified))
        .route("/panic", get(panics))
        .route("/nested/not-found", get(nested_not_found))
        .route("/nested/panic", get(nested_panic))
        .route("/correlation", get(correlation))
}

fn app(environment: Environment) -> Router {
    let config = PipelineConfig {
        environment,
        ..PipelineConfig::default()
    };
    apply_pipeline(routes(), &config).expect("valid pipeline config")
}

async fn send(app: Router, req: Request<Body>) -> Result<(StatusCode, HeaderMap, Value)> {
    let res = app.oneshot(req).await?;
    let status = res.status();
    let headers = res.headers().clone();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };
    Ok((status, headers, json))
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn not_found_produces_problem_document() -> Result<()> {
    let (status, headers, body) =
        send(app(Environment::Production), get_req("/api/products/150")).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(header_str(&headers, "content-type"), Some(APPLICATION_PROBLEM_JSON));
    assert_eq!(body["status"], 404);
    assert_eq!(body["title"], "Resource Not Found");
    assert_eq!(body["detail"], "Product with id '150' was not found.");
    assert_eq!(body["instance"], "/api/products/150");
    assert_eq!(
        body["type"],
        "https://tools.ietf.org/html/rfc9110#section-15.5.5"
    );
    Ok(())
}

#[tokio::test]
async fn correlation_id_round_trips() -> Result<()> {
    let req = Request::builder()
        .uri("/api/products/150")
        .header("X-Correlation-Id", "abc-123")
        .body(Body::empty())?;
    let (_, headers, body) = send(app(Environment::Production), req).await?;

    assert_eq!(header_str(&headers, "x-correlation-id"), Some("abc-123"));
    assert_eq!(body["correlationId"], "abc-123");
    Ok(())
}

#[tokio::test]
async fn correlation_id_is_generated_per_request() -> Result<()> {
    let app = app(Environment::Production);
    let (s1, h1, _) = send(app.clone(), get_req("/ok")).await?;
    let (s2, h2, _) = send(app, get_req("/ok")).await?;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    let first = header_str(&h1, "x-correlation-id").expect("header on first response");
    let second = header_str(&h2, "x-correlation-id").expect("header on second response");
    assert!(!first.is_empty());
    assert!(!second.is_empty());
    assert_ne!(first, second);
    Ok(())
}

#[tokio::test]
async fn blank_inbound_header_is_replaced() -> Result<()> {
    let req = Request::builder()
        .uri("/correlation")
        .header("x-correlation-id", "")
        .body(Body::empty())?;
    let (_, headers, body) = send(app(Environment::Production), req).await?;

    let echoed = header_str(&headers, "x-correlation-id").expect("generated header");
    assert!(!echoed.is_empty());
    assert_eq!(body["correlationId"], echoed);
    Ok(())
}

#[tokio::test]
async fn handler_reads_assigned_correlation_id() -> Result<()> {
    let req = Request::builder()
        .uri("/correlation")
        .header("x-correlation-id", "from-client")
        .body(Body::empty())?;
    let (status, _, body) = send(app(Environment::Production), req).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["correlationId"], "from-client");
    Ok(())
}

#[tokio::test]
async fn correlation_reads_sentinel_without_pipeline() -> Result<()> {
    let (_, headers, body) = send(routes(), get_req("/correlation")).await?;
    assert_eq!(body["correlationId"], "N/A");
    assert!(headers.get("x-correlation-id").is_none());
    Ok(())
}

#[tokio::test]
async fn validation_failure_lists_field_errors() -> Result<()> {
    let (status, _, body) = send(app(Environment::Production), get_req("/invalid")).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], "Validation Error");
    assert_eq!(
        body["detail"],
        "One or more validation failures have occurred."
    );
    assert_eq!(
        body["errors"],
        json!({
            "name": ["Product name is required"],
            "price": ["Price must be greater than 0"]
        })
    );
    Ok(())
}

#[tokio::test]
async fn application_status_is_caller_chosen() -> Result<()> {
    let (status, _, body) = send(app(Environment::Production), get_req("/application")).await?;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], 502);
    assert_eq!(body["title"], "Application Error");
    assert_eq!(body["detail"], "upstream rejected the order");
    Ok(())
}

#[tokio::test]
async fn production_documents_never_carry_diagnostics() -> Result<()> {
    let app = app(Environment::Production);
    for uri in [
        "/api/products/150",
        "/invalid",
        "/application",
        "/unclassified",
        "/panic",
    ] {
        let (_, _, body) = send(app.clone(), get_req(uri)).await?;
        for key in ["exception", "stackTrace", "innerException"] {
            assert!(body.get(key).is_none(), "{uri} leaked {key}");
        }
        assert!(body.get("correlationId").is_some(), "{uri} lost correlationId");
    }
    Ok(())
}

#[tokio::test]
async fn development_documents_carry_diagnostics() -> Result<()> {
    let (_, _, body) = send(app(Environment::Development), get_req("/application")).await?;

    assert_eq!(body["exception"], "ApplicationFailure");
    assert_eq!(body["innerException"], "socket closed");
    assert_eq!(body["detail"], "upstream rejected the order");
    Ok(())
}

#[tokio::test]
async fn unclassified_detail_is_generic_in_every_mode() -> Result<()> {
    for env in [Environment::Production, Environment::Development] {
        let (status, _, body) = send(app(env), get_req("/unclassified")).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["title"], "Internal Server Error");
        assert_eq!(body["detail"], GENERIC_DETAIL);
        assert!(!body.to_string().contains("invalid digit"));
    }

    let (_, _, dev) = send(app(Environment::Development), get_req("/unclassified")).await?;
    assert_eq!(dev["exception"], "ParseIntError");
    Ok(())
}

#[tokio::test]
async fn panics_are_converted() -> Result<()> {
    let (status, headers, body) = send(app(Environment::Development), get_req("/panic")).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(headers.get("x-correlation-id").is_some());
    assert_eq!(body["detail"], GENERIC_DETAIL);
    assert_eq!(body["exception"], "Panic");
    assert_eq!(body["instance"], "/panic");
    Ok(())
}

#[tokio::test]
async fn panic_documents_have_no_stack_trace() -> Result<()> {
    let (status, _, body) = temp_env::async_with_vars(
        [("RUST_BACKTRACE", Some("1"))],
        send(app(Environment::Development), get_req("/panic")),
    )
    .await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["exception"], "Panic");
    assert!(body.get("stackTrace").is_none());
    Ok(())
}

#[tokio::test]
async fn failures_from_spawned_work_are_caught() -> Result<()> {
    let app = app(Environment::Production);

    let (status, _, body) = send(app.clone(), get_req("/nested/not-found")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Order with id 'o-9' was not found.");

    let (status, _, body) = send(app, get_req("/nested/panic")).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], GENERIC_DETAIL);
    Ok(())
}

#[tokio::test]
async fn successful_responses_pass_through() -> Result<()> {
    let res = app(Environment::Development).oneshot(get_req("/ok")).await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    assert_eq!(serde_json::from_slice::<Value>(&body)?, json!({ "ok": true }));
    Ok(())
}

#[tokio::test]
async fn problem_body_is_pretty_printed() -> Result<()> {
    let res = app(Environment::Production)
        .oneshot(get_req("/api/products/7"))
        .await?;
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    let text = String::from_utf8(body.to_vec())?;

    assert!(text.contains("\n  \"status\": 404"));
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn faulted_requests_are_logged_with_correlation_id() -> Result<()> {
    let req = Request::builder()
        .uri("/application")
        .header("x-correlation-id", "trace-me-42")
        .body(Body::empty())?;
    let _ = send(app(Environment::Production), req).await?;

    assert!(logs_contain("An unhandled failure occurred"));
    assert!(logs_contain("trace-me-42"));
    Ok(())
}

struct TeapotConverter;

impl ProblemConverter for TeapotConverter {
    fn convert(&self, failure: &Failure, ctx: &RequestContext) -> ProblemDocument {
        ProblemDocument::new(StatusCode::IM_A_TEAPOT, "Teapot", failure.kind_name())
            .with_instance(ctx.path.clone())
    }
}

#[tokio::test]
async fn custom_converter_replaces_default() -> Result<()> {
    let app = apply_pipeline_with_converter(
        routes(),
        &PipelineConfig::default(),
        Arc::new(TeapotConverter),
    )?;
    let (status, _, body) = send(app, get_req("/invalid")).await?;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body["detail"], "validation");
    assert_eq!(body["instance"], "/invalid");
    Ok(())
}

#[test]
fn invalid_header_name_fails_pipeline_setup() {
    let config = PipelineConfig {
        correlation_header: "not a header".to_owned(),
        ..PipelineConfig::default()
    };
    assert!(apply_pipeline(routes(), &config).is_err());
}
