//! Failure -> problem document translation

use serde_json::Value;

use crate::catalog::{self, UNCLASSIFIED_DETAIL};
use crate::failure::{Failure, FailureKind, FieldErrors};
use crate::problem::{ProblemDocument, ext};

/// The parts of the current request the converter may read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Request path, reported as the document `instance`.
    pub path: String,
    /// Correlation id assigned to the request, if one is known.
    pub correlation_id: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(path: impl Into<String>, correlation_id: Option<String>) -> Self {
        Self {
            path: path.into(),
            correlation_id,
        }
    }
}

/// Maps a caught failure plus request context to a problem document.
///
/// Implementations must be total: every failure produces a document.
pub trait ProblemConverter: Send + Sync {
    fn convert(&self, failure: &Failure, ctx: &RequestContext) -> ProblemDocument;
}

/// Dispatches on the failure kind, most specific first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProblemConverter;

impl ProblemConverter for DefaultProblemConverter {
    fn convert(&self, failure: &Failure, ctx: &RequestContext) -> ProblemDocument {
        let status = failure.status();
        let problem = match failure.kind() {
            FailureKind::Validation(f) => catalog::VALIDATION
                .as_problem(status, f.message())
                .with_extension(ext::ERRORS, field_errors_value(f.errors())),
            FailureKind::NotFound(f) => catalog::NOT_FOUND.as_problem(status, f.message()),
            FailureKind::Application(f) => catalog::APPLICATION.as_problem(status, f.message()),
            FailureKind::Unclassified(_) => catalog::INTERNAL.as_problem(status, UNCLASSIFIED_DETAIL),
        };

        crate::finalize(problem, &ctx.path, ctx.correlation_id.as_deref())
    }
}

fn field_errors_value(errors: &FieldErrors) -> Value {
    Value::Object(
        errors
            .iter()
            .map(|(field, messages)| (field.clone(), Value::from(messages.clone())))
            .collect(),
    )
}

/// Adds `exception`, `stackTrace` and `innerException` to a document.
///
/// Only called in diagnostic mode. `detail` is left untouched, so an
/// unclassified failure still reports the generic message.
pub fn attach_diagnostics(problem: &mut ProblemDocument, failure: &Failure) {
    problem.insert_extension(ext::EXCEPTION, failure.exception_name());
    if let Some(trace) = failure.stack_trace() {
        problem.insert_extension(ext::STACK_TRACE, trace);
    }
    if let Some(inner) = failure.inner_message() {
        problem.insert_extension(ext::INNER_EXCEPTION, inner);
    }
}
