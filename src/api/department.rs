use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    db::Store,
    error::{AppError, AppResult},
    model::department::{DepartmentRemoval, DepartmentSummary},
};

#[derive(Deserialize, Validate, ToSchema)]
pub struct CreateDepartment {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Engineering")]
    pub name: String,
    #[validate(length(max = 255))]
    #[schema(example = "Product development")]
    pub description: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct UpdateDepartment {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

async fn load(store: &Store, id: u64) -> AppResult<DepartmentSummary> {
    store
        .find_department(id)
        .await?
        .ok_or_else(|| AppError::not_found("Department"))
}

/// List departments
#[utoipa::path(
    get,
    path = "/departments",
    responses(
        (status = 200, description = "Departments with head count", body = [DepartmentSummary])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Department"
)]
pub async fn list_departments(store: web::Data<Store>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(store.list_departments().await?))
}

/// Get department by ID
#[utoipa::path(
    get,
    path = "/departments/{department_id}",
    params(
        ("department_id" = u64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department found", body = DepartmentSummary),
        (status = 404, description = "Department not found", body = Object, example = json!({
            "message": "Department not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Department"
)]
pub async fn get_department(
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(load(&store, path.into_inner()).await?))
}

/// Create department (Admin)
#[utoipa::path(
    post,
    path = "/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = DepartmentSummary),
        (status = 409, description = "Name already taken")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Department"
)]
pub async fn create_department(
    auth: AuthUser,
    store: web::Data<Store>,
    payload: web::Json<CreateDepartment>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate()?;

    let id = store
        .insert_department(payload.name.trim(), payload.description.as_deref())
        .await?;

    info!(department_id = id, name = %payload.name, "Department created");
    Ok(HttpResponse::Created().json(load(&store, id).await?))
}

/// Update department (Admin)
#[utoipa::path(
    put,
    path = "/departments/{department_id}",
    params(
        ("department_id" = u64, Path, description = "Department ID")
    ),
    request_body = UpdateDepartment,
    responses(
        (status = 200, description = "Department updated", body = DepartmentSummary),
        (status = 404, description = "Department not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Department"
)]
pub async fn update_department(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
    payload: web::Json<UpdateDepartment>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate()?;

    let id = path.into_inner();
    let name = payload.name.as_deref().map(str::trim);

    if (name.is_some() || payload.description.is_some())
        && !store
            .update_department(id, name, payload.description.as_deref())
            .await?
    {
        return Err(AppError::not_found("Department"));
    }

    Ok(HttpResponse::Ok().json(load(&store, id).await?))
}

/// Delete department (Admin)
///
/// Refused while employees still belong to the department.
#[utoipa::path(
    delete,
    path = "/departments/{department_id}",
    params(
        ("department_id" = u64, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department deleted", body = Object, example = json!({
            "message": "Department deleted"
        })),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department still has employees", body = Object, example = json!({
            "message": "Department still has 3 employee(s)"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Department"
)]
pub async fn delete_department(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let id = path.into_inner();
    match store.delete_department(id).await? {
        DepartmentRemoval::Deleted => {
            info!(department_id = id, "Department deleted");
            Ok(HttpResponse::Ok().json(json!({ "message": "Department deleted" })))
        }
        DepartmentRemoval::NotFound => Err(AppError::not_found("Department")),
        DepartmentRemoval::HasEmployees(n) => Err(AppError::Conflict(format!(
            "Department still has {n} employee(s)"
        ))),
    }
}
