//! Core failure and problem-document types for faultline
//!
//! This crate provides pure data types for request failure handling, with no
//! dependencies on HTTP frameworks unless the `axum` feature is enabled. It includes:
//! - the failure taxonomy (`Failure`, `FailureKind`)
//! - RFC 9457 problem documents (`ProblemDocument`)
//! - the problem-type catalog (`ProblemType`)
//! - the failure-to-document converter (`ProblemConverter`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod converter;
pub mod failure;
pub mod problem;

// Re-export commonly used types
pub use catalog::ProblemType;
pub use converter::{DefaultProblemConverter, ProblemConverter, RequestContext, attach_diagnostics};
#[cfg(feature = "axum")]
pub use failure::RaisedFailure;
pub use failure::{
    ApplicationFailure, Failure, FailureKind, FieldErrors, NotFoundFailure, UnclassifiedFailure,
    ValidationFailure,
};
pub use problem::{APPLICATION_PROBLEM_JSON, ProblemDocument};

/// Helper to attach instance and correlation id to a document
///
/// This is a convenience function for enriching documents with
/// request-specific context before returning them as HTTP responses.
pub fn finalize(
    mut p: ProblemDocument,
    instance: &str,
    correlation_id: Option<&str>,
) -> ProblemDocument {
    p = p.with_instance(instance);
    if let Some(cid) = correlation_id {
        p = p.with_correlation_id(cid);
    }
    p
}
