use actix_web::{
    Error, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::state::ServiceStatus;

/// Paths served even while the database is unavailable.
const OPEN_PATHS: [&str; 3] = [
    "/api/status",
    "/accounts/verify-email",
    "/account/verify-email",
];

/// Path prefixes served even while the database is unavailable.
const OPEN_PREFIXES: [&str; 2] = ["/api-docs", "/swagger-ui"];

#[derive(Serialize)]
pub struct MaintenanceNotice {
    pub message: &'static str,
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl MaintenanceNotice {
    pub fn now() -> Self {
        Self {
            message: "Service temporarily unavailable, maintenance in progress",
            status: "maintenance",
            timestamp: Utc::now(),
        }
    }
}

pub fn bypasses_gate(path: &str) -> bool {
    OPEN_PATHS.contains(&path)
        || OPEN_PREFIXES.iter().any(|prefix| {
            path.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
}

/// Short-circuits business requests with 503 while the service is degraded.
pub async fn maintenance_gate(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let online = req
        .app_data::<Data<ServiceStatus>>()
        .is_some_and(|status| status.is_online());

    if online || bypasses_gate(req.path()) {
        return next.call(req).await;
    }

    debug!(path = %req.path(), "Request rejected in maintenance mode");
    let resp = HttpResponse::ServiceUnavailable().json(MaintenanceNotice::now());
    Ok(req.into_response(resp.map_into_boxed_body()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_matches_exact_paths_and_prefixes() {
        assert!(bypasses_gate("/api/status"));
        assert!(bypasses_gate("/accounts/verify-email"));
        assert!(bypasses_gate("/account/verify-email"));
        assert!(bypasses_gate("/api-docs"));
        assert!(bypasses_gate("/api-docs/openapi.json"));
        assert!(bypasses_gate("/swagger-ui/index.html"));
    }

    #[test]
    fn business_paths_are_gated() {
        assert!(!bypasses_gate("/employees"));
        assert!(!bypasses_gate("/employees/1/transfer"));
        assert!(!bypasses_gate("/accounts/authenticate"));
        assert!(!bypasses_gate("/api-docsx"));
        assert!(!bypasses_gate("/api/status/extra"));
    }
}
