//! Demonstration host for the faultline failure pipeline.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod logging;
pub mod signals;

use axum::Router;
use faultline_http::{ConfigError, PipelineConfig};

/// Demo routes wrapped in the trace, correlation and exception-handling stages.
///
/// # Errors
/// Returns `ConfigError` if the pipeline configuration is invalid.
pub fn build_router(pipeline: &PipelineConfig) -> Result<Router, ConfigError> {
    faultline_http::apply_pipeline(api::router(), pipeline)
}
