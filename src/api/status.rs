use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{ServiceMode, ServiceStatus};

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    #[schema(value_type = String, example = "online")]
    pub status: ServiceMode,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
}

/// Service connectivity
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Current service mode", body = StatusResponse)
    ),
    tag = "Status"
)]
pub async fn service_status(status: web::Data<ServiceStatus>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: status.mode(),
        timestamp: Utc::now(),
    })
}
