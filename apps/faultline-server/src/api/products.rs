use axum::extract::Path;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use faultline_errors::{Failure, FieldErrors};

use super::ApiResult;
use super::dto::{CreateProductReq, ProductDto};

const MAX_PRODUCT_ID: i64 = 100;
const DEMO_PRICE: f64 = 99.99;

/// Internal error of the product catalog. Reaches callers only as an
/// unclassified failure.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("This is an unhandled exception for testing")]
    Internal,
}

pub(super) fn router() -> Router {
    Router::new()
        .route("/api/products", post(create_product))
        .route("/api/products/error", get(application_error))
        .route("/api/products/unhandled", get(unhandled_error))
        .route("/api/products/panic", get(panicking))
        .route("/api/products/{id}", get(get_product))
}

async fn get_product(Path(id): Path<String>) -> ApiResult<Json<ProductDto>> {
    let id = match id.trim().parse::<i64>() {
        Ok(id) if id > 0 => id,
        _ => {
            return Err(Failure::invalid_field(
                "id",
                "Product ID must be greater than 0",
            ));
        }
    };

    if id > MAX_PRODUCT_ID {
        return Err(Failure::not_found("Product", id));
    }

    tracing::debug!(product_id = id, "Product found");
    Ok(Json(ProductDto {
        id,
        name: format!("Product {id}"),
        price: DEMO_PRICE,
    }))
}

async fn create_product(
    payload: Result<Json<CreateProductReq>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload.map_err(|rejection| {
        Failure::invalid_field("body", rejection.body_text())
    })?;

    let mut errors = FieldErrors::new();
    if req.name.trim().is_empty() {
        errors
            .entry("name".to_owned())
            .or_default()
            .push("Product name is required".to_owned());
    }
    if req.price <= 0.0 {
        errors
            .entry("price".to_owned())
            .or_default()
            .push("Price must be greater than 0".to_owned());
    }
    if !errors.is_empty() {
        return Err(Failure::validation(errors));
    }

    tracing::info!(name = %req.name, "Product created");
    Ok((
        StatusCode::CREATED,
        [(LOCATION, "/api/products/1")],
        Json(req),
    )
        .into_response())
}

async fn application_error() -> ApiResult<Json<ProductDto>> {
    Err(Failure::application(
        "A custom application error occurred",
        StatusCode::SERVICE_UNAVAILABLE,
    ))
}

async fn unhandled_error() -> ApiResult<Json<ProductDto>> {
    Err(CatalogError::Internal.into())
}

async fn panicking() -> Json<ProductDto> {
    panic!("product catalog is in an inconsistent state");
}
