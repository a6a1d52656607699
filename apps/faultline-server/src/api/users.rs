use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use faultline_errors::Failure;
use faultline_http::CurrentCorrelationId;

use super::ApiResult;
use super::dto::{CorrelationInfo, UserDto};

const KNOWN_USER_ID: &str = "123";

pub(super) fn router() -> Router {
    Router::new()
        .route("/api/users/correlation", get(current_correlation))
        .route("/api/users/{id}", get(get_user))
}

async fn get_user(Path(id): Path<String>) -> ApiResult<Json<UserDto>> {
    if id.trim().is_empty() {
        return Err(Failure::invalid_field("id", "User ID cannot be empty"));
    }
    if id != KNOWN_USER_ID {
        return Err(Failure::not_found("User", id));
    }

    Ok(Json(UserDto {
        id,
        name: "John Doe".to_owned(),
        email: "john.doe@example.com".to_owned(),
    }))
}

/// Reports the id the correlation stage assigned to this request.
async fn current_correlation(
    CurrentCorrelationId(correlation_id): CurrentCorrelationId,
) -> Json<CorrelationInfo> {
    Json(CorrelationInfo { correlation_id })
}
