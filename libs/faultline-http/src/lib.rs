//! Request pipeline stages that turn failures into problem documents.
//!
//! Runtime execution order (outermost -> innermost):
//!   1. Trace               - one `http_request` span per request
//!   2. Correlation         - assign / reuse `X-Correlation-Id`, echo it on the response
//!   3. `ExceptionHandling` - catch any failure or panic and answer with problem+json
//!   4. Router              - application handlers
//!
//! ```ignore
//! let app = faultline_http::apply_pipeline(routes, &PipelineConfig::default())?;
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod correlation;
pub mod exception;
pub mod trace;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use faultline_errors::{DefaultProblemConverter, ProblemConverter};

pub use config::{ConfigError, Environment, PipelineConfig};
pub use correlation::{CORRELATION_ID_HEADER, CorrelationId, CurrentCorrelationId};
pub use exception::ExceptionHandler;
pub use faultline_errors::Failure;

/// Install the pipeline around `router` with the default converter.
///
/// # Errors
/// Returns `ConfigError` if the configured correlation header name is invalid.
pub fn apply_pipeline<S>(router: Router<S>, config: &PipelineConfig) -> Result<Router<S>, ConfigError>
where
    S: Clone + Send + Sync + 'static,
{
    apply_pipeline_with_converter(router, config, Arc::new(DefaultProblemConverter))
}

/// Install the pipeline around `router` with a custom converter.
///
/// # Errors
/// Returns `ConfigError` if the configured correlation header name is invalid.
pub fn apply_pipeline_with_converter<S>(
    mut router: Router<S>,
    config: &PipelineConfig,
    converter: Arc<dyn ProblemConverter>,
) -> Result<Router<S>, ConfigError>
where
    S: Clone + Send + Sync + 'static,
{
    let header = config.correlation_header_name()?;
    let handler = ExceptionHandler::with_converter(converter, config.diagnostics_enabled());

    tracing::debug!(
        environment = %config.environment,
        diagnostics = handler.diagnostics(),
        header = %header,
        "Installing failure pipeline"
    );

    // Layer registration order (reverse of execution): innermost -> outermost

    // 3) Exception handling wraps every handler
    router = router.layer(from_fn_with_state(
        handler,
        exception::exception_handling_middleware,
    ));

    // 2) Correlation runs first so a failure always has an id to report
    router = router.layer(from_fn_with_state(
        header,
        correlation::correlation_middleware,
    ));

    // 1) Trace (registered last, runs first - outermost layer)
    Ok(trace::apply_trace_layer(router))
}
