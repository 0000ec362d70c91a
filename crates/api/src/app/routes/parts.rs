use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use partstock_core::PartId;

use crate::app::services::SharedService;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/api/part", post(create_part))
        .route("/api/part/:part_id", post(adjust_inventory).get(get_part))
}

pub async fn create_part(
    Extension(services): Extension<SharedService>,
    body: Result<Json<dto::CreatePartRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let request = match dto::to_new_part(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.create_part(request).await {
        Ok(part) => (StatusCode::CREATED, Json(dto::part_to_json(&part))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn adjust_inventory(
    Extension(services): Extension<SharedService>,
    Path(part_id): Path<String>,
    body: Result<Json<dto::AdjustInventoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let quantity = match dto::to_adjust_quantity(body) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.adjust_inventory(&PartId::from(part_id), quantity).await {
        // Insufficient stock is a normal outcome, not an HTTP error.
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_part(
    Extension(services): Extension<SharedService>,
    Path(part_id): Path<String>,
) -> axum::response::Response {
    match services.get_part(&PartId::from(part_id)).await {
        Ok(part) => (StatusCode::OK, Json(dto::part_to_json(&part))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
