//! Per-request correlation id.
//!
//! The id is taken from the inbound `X-Correlation-Id` header when the client
//! sent a non-blank value, otherwise a fresh UUID is generated. It is stored in
//! the request extensions for downstream consumers and echoed on the response.

use std::convert::Infallible;
use std::fmt;

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::request::Parts;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// Canonical header name (wire form `X-Correlation-Id`).
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Reported by [`read`] when no id was ever assigned.
pub const MISSING_CORRELATION_ID: &str = "N/A";

#[must_use]
pub fn header() -> HeaderName {
    HeaderName::from_static(CORRELATION_ID_HEADER)
}

/// Opaque per-request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reuse the client-supplied id verbatim, or generate a new one.
///
/// Values that are blank or not visible ASCII count as absent.
#[must_use]
pub fn assign(headers: &HeaderMap, name: &HeaderName) -> CorrelationId {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(CorrelationId::generate, |v| CorrelationId(v.to_owned()))
}

/// Current request's id, or `"N/A"` if none was assigned.
#[must_use]
pub fn read(extensions: &Extensions) -> String {
    extensions
        .get::<CorrelationId>()
        .map_or_else(|| MISSING_CORRELATION_ID.to_owned(), |id| id.0.clone())
}

/// Extractor for handlers that report the correlation id back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentCorrelationId(pub String);

impl<S> FromRequestParts<S> for CurrentCorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(read(&parts.extensions)))
    }
}

/// Assigns the id, records it on the request span and in the request
/// extensions, and sets it on the response.
pub async fn correlation_middleware(
    State(name): State<HeaderName>,
    mut req: Request,
    next: Next,
) -> Response {
    let id = assign(req.headers(), &name);
    tracing::Span::current().record("correlation_id", id.as_str());

    let value = HeaderValue::from_str(id.as_str());
    req.extensions_mut().insert(id);

    let mut res = next.run(req).await;
    match value {
        Ok(v) => {
            res.headers_mut().insert(name, v);
        }
        Err(e) => tracing::warn!(error = %e, "correlation id is not a valid header value"),
    }
    res
}
