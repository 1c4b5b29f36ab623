use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    db::Store,
    error::{AppError, AppResult},
    model::request::{NewRequest, Request, RequestDetail, RequestItem},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "Equipment")]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<RequestItem>,
}

/// List requests
#[utoipa::path(
    get,
    path = "/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "Requests, newest first", body = [Request])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Request"
)]
pub async fn list_requests(
    store: web::Data<Store>,
    query: web::Query<RequestFilter>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(store.list_requests(query.employee_id).await?))
}

/// Get request with items
#[utoipa::path(
    get,
    path = "/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request found", body = RequestDetail),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Request"
)]
pub async fn get_request(
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request = store
        .find_request(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Request"))?;

    Ok(HttpResponse::Ok().json(request))
}

/// Create request
///
/// The request and its items are written together or not at all.
#[utoipa::path(
    post,
    path = "/requests",
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request created", body = RequestDetail),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Request"
)]
pub async fn create_request(
    store: web::Data<Store>,
    payload: web::Json<CreateRequest>,
) -> AppResult<HttpResponse> {
    payload.validate()?;

    if payload.items.iter().any(|item| item.name.trim().is_empty() || item.quantity == 0) {
        return Err(AppError::BadRequest(
            "Every item needs a name and a positive quantity".into(),
        ));
    }

    let payload = payload.into_inner();
    let request_id = store
        .create_request(&NewRequest {
            employee_id: payload.employee_id,
            kind: payload.kind,
            items: payload.items,
        })
        .await?
        .ok_or_else(|| AppError::not_found("Employee"))?;

    info!(request_id, "Request created");

    let created = store
        .find_request(request_id)
        .await?
        .ok_or_else(|| AppError::not_found("Request"))?;
    Ok(HttpResponse::Created().json(created))
}

/// Delete request (Admin)
#[utoipa::path(
    delete,
    path = "/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request deleted", body = Object, example = json!({
            "message": "Request deleted"
        })),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Request"
)]
pub async fn delete_request(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let request_id = path.into_inner();
    if !store.delete_request(request_id).await? {
        return Err(AppError::not_found("Request"));
    }

    info!(request_id, "Request deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Request deleted" })))
}
