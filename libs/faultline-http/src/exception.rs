//! Exception-handling stage.
//!
//! Wraps all downstream handling of a request. A downstream call either
//! completes with a normal response, which passes through untouched, or faults:
//! a handler returned a `Failure` (left in the response extensions by
//! `Failure::into_response`) or panicked. A faulted request is logged with its
//! correlation id, converted into a problem document and answered with
//! `application/problem+json`. Exactly one of the two responses is produced.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use faultline_errors::{
    DefaultProblemConverter, Failure, ProblemConverter, RaisedFailure, RequestContext,
    attach_diagnostics,
};
use futures::FutureExt;

use crate::correlation::{CorrelationId, MISSING_CORRELATION_ID};

/// Shared state of the stage: the converter and the host's diagnostic flag.
#[derive(Clone)]
pub struct ExceptionHandler {
    converter: Arc<dyn ProblemConverter>,
    diagnostics: bool,
}

impl ExceptionHandler {
    #[must_use]
    pub fn new(diagnostics: bool) -> Self {
        Self::with_converter(Arc::new(DefaultProblemConverter), diagnostics)
    }

    #[must_use]
    pub fn with_converter(converter: Arc<dyn ProblemConverter>, diagnostics: bool) -> Self {
        Self {
            converter,
            diagnostics,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    /// Log, convert and serialize one failure.
    #[must_use]
    pub fn respond(&self, failure: &Failure, ctx: &RequestContext) -> Response {
        let correlation_id = ctx
            .correlation_id
            .as_deref()
            .unwrap_or(MISSING_CORRELATION_ID);
        tracing::error!(
            correlation_id = %correlation_id,
            failure_kind = failure.kind_name(),
            status = failure.status().as_u16(),
            error = %failure,
            "An unhandled failure occurred. CorrelationId: {correlation_id}"
        );

        let mut problem = self.converter.convert(failure, ctx);
        if self.diagnostics {
            attach_diagnostics(&mut problem, failure);
        }
        problem.into_response()
    }
}

impl std::fmt::Debug for ExceptionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionHandler")
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

enum Outcome {
    Completed(Response),
    Faulted(Arc<Failure>),
}

/// Snapshot what the converter may read before the request moves downstream.
fn request_context(req: &Request) -> RequestContext {
    RequestContext::new(
        req.uri().path(),
        req.extensions()
            .get::<CorrelationId>()
            .map(|id| id.as_str().to_owned()),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_owned()
    }
}

/// Runs the downstream chain to completion and translates any failure.
pub async fn exception_handling_middleware(
    State(handler): State<ExceptionHandler>,
    req: Request,
    next: Next,
) -> Response {
    let ctx = request_context(&req);

    let outcome = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(res) => {
            let raised = res
                .extensions()
                .get::<RaisedFailure>()
                .map(|raised| Arc::clone(&raised.0));
            match raised {
                Some(failure) => Outcome::Faulted(failure),
                None => Outcome::Completed(res),
            }
        }
        Err(payload) => Outcome::Faulted(Arc::new(Failure::panic(panic_message(
            payload.as_ref(),
        )))),
    };

    match outcome {
        Outcome::Completed(res) => res,
        Outcome::Faulted(failure) => handler.respond(&failure, &ctx),
    }
}
