//! RFC 9457 problem documents (pure data model, no HTTP framework dependencies)

use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Content type for problem documents as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Well-known extension member names.
pub mod ext {
    pub const CORRELATION_ID: &str = "correlationId";
    pub const ERRORS: &str = "errors";
    pub const EXCEPTION: &str = "exception";
    pub const STACK_TRACE: &str = "stackTrace";
    pub const INNER_EXCEPTION: &str = "innerException";
}

/// Custom serializer for `StatusCode` to u16
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

/// Custom deserializer for `StatusCode` from u16
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// Machine-parsable description of a failed request.
///
/// Extension members are flattened into the top-level JSON object, so
/// `extensions["correlationId"]` serializes as a sibling of `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use]
pub struct ProblemDocument {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code for this occurrence of the problem.
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: StatusCode,
    /// A human-readable explanation specific to this occurrence of the problem.
    pub detail: String,
    /// The request path that produced the problem.
    pub instance: String,
    /// Additional members (`correlationId`, `errors`, diagnostics).
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ProblemDocument {
    /// Create a new document with the given status, title, and detail.
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.into(),
            status,
            detail: detail.into(),
            instance: String::new(),
            extensions: Map::new(),
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, path: impl Into<String>) -> Self {
        self.instance = path.into();
        self
    }

    pub fn with_correlation_id(self, id: impl Into<String>) -> Self {
        self.with_extension(ext::CORRELATION_ID, id.into())
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_extension(key, value);
        self
    }

    /// Set an extension member in place, replacing any previous value.
    pub fn insert_extension(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extensions.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.extension(ext::CORRELATION_ID).and_then(Value::as_str)
    }

    /// Render the document as indented JSON.
    ///
    /// # Errors
    /// Returns an error if an extension value cannot be serialized.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Axum integration: make `ProblemDocument` directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ProblemDocument {
    fn into_response(self) -> axum::response::Response {
        use axum::http::HeaderValue;

        let status = self.status;
        match self.to_pretty_json() {
            Ok(body) => {
                let mut resp = (status, body).into_response();
                resp.headers_mut().insert(
                    axum::http::header::CONTENT_TYPE,
                    HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
                );
                resp
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize problem document");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
