use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::IntoParams;

use crate::{
    auth::auth::AuthUser,
    db::Store,
    error::{AppError, AppResult},
    model::workflow::{Workflow, WorkflowStatus},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WorkflowFilter {
    /// Only workflows of this employee
    pub employee_id: Option<u64>,
}

/// List workflows
#[utoipa::path(
    get,
    path = "/workflows",
    params(WorkflowFilter),
    responses(
        (status = 200, description = "Audit trail, newest first", body = [Workflow])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Workflow"
)]
pub async fn list_workflows(
    store: web::Data<Store>,
    query: web::Query<WorkflowFilter>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(store.list_workflows(query.employee_id).await?))
}

/// Get workflow by ID
#[utoipa::path(
    get,
    path = "/workflows/{workflow_id}",
    params(
        ("workflow_id" = u64, Path, description = "Workflow ID")
    ),
    responses(
        (status = 200, description = "Workflow found", body = Workflow),
        (status = 404, description = "Workflow not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Workflow"
)]
pub async fn get_workflow(
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let workflow = store
        .find_workflow(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Workflow"))?;

    Ok(HttpResponse::Ok().json(workflow))
}

async fn decide(
    auth: AuthUser,
    store: web::Data<Store>,
    workflow_id: u64,
    status: WorkflowStatus,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    if !store.decide_workflow(workflow_id, status).await? {
        return Err(AppError::BadRequest(
            "Workflow not found or already processed".into(),
        ));
    }

    info!(workflow_id, %status, decided_by = auth.account_id, "Workflow decided");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Workflow {}", status.as_ref().to_lowercase())
    })))
}

/// Approve workflow (Admin)
#[utoipa::path(
    put,
    path = "/workflows/{workflow_id}/approve",
    params(
        ("workflow_id" = u64, Path, description = "ID of the pending workflow to approve")
    ),
    responses(
        (status = 200, description = "Workflow approved", body = Object, example = json!({
            "message": "Workflow approved"
        })),
        (status = 400, description = "Workflow not found or already processed", body = Object, example = json!({
            "message": "Workflow not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Workflow"
)]
pub async fn approve_workflow(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    decide(auth, store, path.into_inner(), WorkflowStatus::Approved).await
}

/// Reject workflow (Admin)
#[utoipa::path(
    put,
    path = "/workflows/{workflow_id}/reject",
    params(
        ("workflow_id" = u64, Path, description = "ID of the pending workflow to reject")
    ),
    responses(
        (status = 200, description = "Workflow rejected", body = Object, example = json!({
            "message": "Workflow rejected"
        })),
        (status = 400, description = "Workflow not found or already processed", body = Object, example = json!({
            "message": "Workflow not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Workflow"
)]
pub async fn reject_workflow(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    decide(auth, store, path.into_inner(), WorkflowStatus::Rejected).await
}
