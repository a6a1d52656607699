//! Demonstration endpoints that exercise every failure kind.

mod dto;
mod products;
mod users;

use axum::Router;
use axum::http::Uri;
use faultline_errors::Failure;

pub use dto::{CorrelationInfo, CreateProductReq, ProductDto, UserDto};
pub use products::CatalogError;

pub(crate) type ApiResult<T> = Result<T, Failure>;

/// All demo routes, without the failure pipeline.
pub fn router() -> Router {
    Router::new()
        .merge(products::router())
        .merge(users::router())
        .fallback(no_route)
}

async fn no_route(uri: Uri) -> Failure {
    Failure::not_found_message(format!("No route matches '{}'.", uri.path()))
}
