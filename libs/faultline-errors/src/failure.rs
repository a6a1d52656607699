//! Failure taxonomy raised by request handlers.
//!
//! Handlers signal an intentional error response by returning one of the three
//! typed kinds (validation, not-found, application). Any other error type that
//! reaches a `Failure` through `?` becomes an unclassified failure whose
//! message is never shown to callers.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;

/// Field name -> ordered list of messages for that field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Boxed cause carried by an application failure.
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

const VALIDATION_MANY: &str = "One or more validation failures have occurred.";
const VALIDATION_ONE: &str = "Validation failure occurred.";

/// Caller input was malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    message: String,
    errors: FieldErrors,
}

impl ValidationFailure {
    pub const STATUS: StatusCode = StatusCode::BAD_REQUEST;

    #[must_use]
    pub fn new(errors: FieldErrors) -> Self {
        Self {
            message: VALIDATION_MANY.to_owned(),
            errors,
        }
    }

    /// One field, one message.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        Self {
            message: VALIDATION_ONE.to_owned(),
            errors,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }
}

/// A referenced resource does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundFailure {
    resource: Option<String>,
    key: Option<String>,
    message: String,
}

impl NotFoundFailure {
    pub const STATUS: StatusCode = StatusCode::NOT_FOUND;

    /// Derives the message `"{resource} with id '{key}' was not found."`.
    #[must_use]
    pub fn new(resource: impl Into<String>, key: impl fmt::Display) -> Self {
        let resource = resource.into();
        let key = key.to_string();
        Self {
            message: format!("{resource} with id '{key}' was not found."),
            resource: Some(resource),
            key: Some(key),
        }
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            resource: None,
            key: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Intentional business-rule failure with a caller-chosen status.
#[derive(Debug)]
pub struct ApplicationFailure {
    message: String,
    status: StatusCode,
    cause: Option<BoxedCause>,
}

impl ApplicationFailure {
    /// Status defaults to `500 Internal Server Error`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            cause: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxedCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

/// Anything that was not raised as one of the typed kinds.
///
/// The message is kept for logs and diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnclassifiedFailure {
    type_name: String,
    message: String,
    source_message: Option<String>,
}

impl UnclassifiedFailure {
    pub const STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

    fn from_error<E>(err: &E) -> Self
    where
        E: StdError + 'static,
    {
        Self {
            type_name: short_type_name(std::any::type_name::<E>()).to_owned(),
            message: err.to_string(),
            source_message: err.source().map(ToString::to_string),
        }
    }

    /// A panic caught while handling the request.
    #[must_use]
    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            type_name: "Panic".to_owned(),
            message: message.into(),
            source_message: None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn source_message(&self) -> Option<&str> {
        self.source_message.as_deref()
    }
}

/// Closed set of failure kinds.
#[derive(Debug)]
pub enum FailureKind {
    Validation(ValidationFailure),
    NotFound(NotFoundFailure),
    Application(ApplicationFailure),
    Unclassified(UnclassifiedFailure),
}

/// A request-scoped failure together with the backtrace captured where it was
/// raised.
///
/// `Failure` intentionally does not implement `std::error::Error`: every
/// `E: Error + Send + Sync + 'static` converts into an unclassified failure,
/// so `?` works on arbitrary errors inside handlers.
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    backtrace: Backtrace,
}

impl Failure {
    fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// The stack at construction time says nothing about where the failure
    /// happened, so no backtrace is kept.
    fn new_without_trace(kind: FailureKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::disabled(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_forced_backtrace(mut self) -> Self {
        self.backtrace = Backtrace::force_capture();
        self
    }

    /// Validation failure carrying a full field-error map.
    #[must_use]
    pub fn validation(errors: FieldErrors) -> Self {
        ValidationFailure::new(errors).into()
    }

    /// Validation failure for a single field.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationFailure::single(field, message).into()
    }

    #[must_use]
    pub fn not_found(resource: impl Into<String>, key: impl fmt::Display) -> Self {
        NotFoundFailure::new(resource, key).into()
    }

    #[must_use]
    pub fn not_found_message(message: impl Into<String>) -> Self {
        NotFoundFailure::with_message(message).into()
    }

    #[must_use]
    pub fn application(message: impl Into<String>, status: StatusCode) -> Self {
        ApplicationFailure::new(message).with_status(status).into()
    }

    #[must_use]
    pub fn application_with_cause(
        message: impl Into<String>,
        cause: impl Into<BoxedCause>,
        status: StatusCode,
    ) -> Self {
        ApplicationFailure::new(message)
            .with_status(status)
            .with_cause(cause)
            .into()
    }

    /// Built after the unwind has finished, so it never carries a `stackTrace`.
    #[must_use]
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new_without_trace(FailureKind::Unclassified(UnclassifiedFailure::panic(
            message,
        )))
    }

    #[must_use]
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Status fixed when the failure was constructed.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.kind {
            FailureKind::Validation(_) => ValidationFailure::STATUS,
            FailureKind::NotFound(_) => NotFoundFailure::STATUS,
            FailureKind::Application(f) => f.status(),
            FailureKind::Unclassified(_) => UnclassifiedFailure::STATUS,
        }
    }

    /// Short kind label for logs.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            FailureKind::Validation(_) => "validation",
            FailureKind::NotFound(_) => "not_found",
            FailureKind::Application(_) => "application",
            FailureKind::Unclassified(_) => "unclassified",
        }
    }

    /// Concrete failure type name reported in diagnostic mode.
    #[must_use]
    pub fn exception_name(&self) -> &str {
        match &self.kind {
            FailureKind::Validation(_) => "ValidationFailure",
            FailureKind::NotFound(_) => "NotFoundFailure",
            FailureKind::Application(_) => "ApplicationFailure",
            FailureKind::Unclassified(f) => f.type_name(),
        }
    }

    /// Internal message. Unclassified messages must not reach callers.
    #[must_use]
    pub fn message(&self) -> &str {
        match &self.kind {
            FailureKind::Validation(f) => f.message(),
            FailureKind::NotFound(f) => f.message(),
            FailureKind::Application(f) => f.message(),
            FailureKind::Unclassified(f) => f.message(),
        }
    }

    /// Message of the wrapped cause, if any.
    #[must_use]
    pub fn inner_message(&self) -> Option<String> {
        match &self.kind {
            FailureKind::Application(f) => f.cause().map(ToString::to_string),
            FailureKind::Unclassified(f) => f.source_message().map(ToOwned::to_owned),
            FailureKind::Validation(_) | FailureKind::NotFound(_) => None,
        }
    }

    /// Rendered backtrace, present only when one was actually captured.
    #[must_use]
    pub fn stack_trace(&self) -> Option<String> {
        (self.backtrace.status() == BacktraceStatus::Captured)
            .then(|| self.backtrace.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.exception_name(), self.message())
    }
}

impl From<ValidationFailure> for Failure {
    fn from(f: ValidationFailure) -> Self {
        Self::new(FailureKind::Validation(f))
    }
}

impl From<NotFoundFailure> for Failure {
    fn from(f: NotFoundFailure) -> Self {
        Self::new(FailureKind::NotFound(f))
    }
}

impl From<ApplicationFailure> for Failure {
    fn from(f: ApplicationFailure) -> Self {
        Self::new(FailureKind::Application(f))
    }
}

impl From<UnclassifiedFailure> for Failure {
    fn from(f: UnclassifiedFailure) -> Self {
        Self::new(FailureKind::Unclassified(f))
    }
}

impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::new(FailureKind::Unclassified(UnclassifiedFailure::from_error(
            &err,
        )))
    }
}

/// `core::num::error::ParseIntError` -> `ParseIntError`
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Marker left in response extensions by `Failure::into_response` so the
/// exception-handling stage can translate it.
#[cfg(feature = "axum")]
#[derive(Debug, Clone)]
pub struct RaisedFailure(pub std::sync::Arc<Failure>);

#[cfg(feature = "axum")]
impl RaisedFailure {
    #[must_use]
    pub fn failure(&self) -> &Failure {
        &self.0
    }
}

/// Handlers return `Result<_, Failure>`. The response produced here only
/// carries the status and the raised failure; the body is written by the
/// exception-handling stage.
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Failure {
    fn into_response(self) -> axum::response::Response {
        let mut resp = self.status().into_response();
        resp.extensions_mut()
            .insert(RaisedFailure(std::sync::Arc::new(self)));
        resp
    }
}
