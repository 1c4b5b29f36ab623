use std::collections::BTreeMap;

use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    db::{EmployeeFilter, Store},
    error::{AppError, AppResult},
    model::{
        employee::{EmployeeChanges, EmployeeDetail, EmployeeStatus},
        workflow::{WorkflowStatus, WorkflowType},
    },
    workflow::{Engine, OnboardCommand, TransferCommand, TransferOutcome},
};

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[schema(example = 3)]
    pub account_id: Option<u64>,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Software Engineer")]
    pub position: String,
    /// Defaults to today
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
    pub status: Option<EmployeeStatus>,
}

impl CreateEmployee {
    /// Trims the free-text fields so blank values fail the length checks.
    fn trimmed(mut self) -> Self {
        self.employee_id = self.employee_id.trim().to_string();
        self.position = self.position.trim().to_string();
        self
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Filter by department
    pub department_id: Option<u64>,
    /// Filter by status
    pub status: Option<EmployeeStatus>,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    #[validate(length(min = 1, max = 20))]
    pub employee_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub position: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
    pub status: Option<EmployeeStatus>,
    /// Accepted only when unchanged; use the transfer endpoint to move
    pub department_id: Option<u64>,
}

impl UpdateEmployee {
    fn trimmed(mut self) -> Self {
        self.employee_id = self.employee_id.map(|code| code.trim().to_string());
        self.position = self.position.map(|position| position.trim().to_string());
        self
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[schema(example = 2)]
    pub department_id: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferredEmployee {
    pub id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "Finance")]
    pub new_department: String,
}

#[derive(Serialize, ToSchema)]
pub struct WorkflowRef {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: WorkflowType,
    pub status: WorkflowStatus,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "message": "Employee transferred successfully",
    "employee": { "id": 1, "name": "Jane Doe", "newDepartment": "Finance" },
    "workflow": { "id": 7, "type": "Transfer", "status": "Pending" },
    "departmentCounts": { "1": 2, "2": 2 }
}))]
pub struct TransferResponse {
    pub message: &'static str,
    pub employee: TransferredEmployee,
    pub workflow: WorkflowRef,
    /// Head count per department id, old and new
    pub department_counts: BTreeMap<u64, i64>,
}

impl From<TransferOutcome> for TransferResponse {
    fn from(outcome: TransferOutcome) -> Self {
        Self {
            message: "Employee transferred successfully",
            employee: TransferredEmployee {
                id: outcome.employee_id,
                name: outcome.employee_name,
                new_department: outcome.new_department_name,
            },
            workflow: WorkflowRef {
                id: outcome.workflow_id,
                kind: outcome.workflow_type,
                status: outcome.workflow_status,
            },
            department_counts: outcome.department_counts,
        }
    }
}

async fn load(store: &Store, id: u64) -> AppResult<EmployeeDetail> {
    store
        .find_employee(id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee"))
}

/// Onboard employee (Admin)
///
/// Creates the employee and its pending onboarding workflow in one transaction.
/// The payload shape is checked first (400 `Invalid value for: ...`), then
/// department, account and employee id in that order.
#[utoipa::path(
    post,
    path = "/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = EmployeeDetail),
        (status = 400, description = "Missing department or account, inactive account", body = Object, example = json!({
            "message": "Department must be selected"
        })),
        (status = 404, description = "Department or account not found"),
        (status = 409, description = "Account already employed or employee id taken"),
        (status = 503, description = "Maintenance mode or database timeout")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let payload = payload.into_inner().trimmed();
    payload.validate()?;

    let created = engine
        .onboard(OnboardCommand {
            employee_code: payload.employee_id,
            account_id: payload.account_id,
            department_id: payload.department_id,
            position: payload.position,
            hire_date: payload
                .hire_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            status: payload.status.unwrap_or_default(),
        })
        .await?;

    Ok(HttpResponse::Created().json(created))
}

/// List employees
#[utoipa::path(
    get,
    path = "/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employees with account and department", body = [EmployeeDetail])
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    store: web::Data<Store>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    let filter = EmployeeFilter {
        department_id: query.department_id,
        status: query.status,
    };

    Ok(HttpResponse::Ok().json(store.list_employees(&filter).await?))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDetail),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(load(&store, path.into_inner()).await?))
}

/// Update Employee (Admin)
#[utoipa::path(
    put,
    path = "/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeDetail),
        (status = 400, description = "Department change requested", body = Object, example = json!({
            "message": "Use the transfer endpoint to change department"
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee id already taken")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let payload = payload.into_inner().trimmed();
    payload.validate()?;

    let employee_id = path.into_inner();
    let current = load(&store, employee_id).await?;

    if payload
        .department_id
        .is_some_and(|d| d != current.employee.department_id)
    {
        return Err(AppError::BadRequest(
            "Use the transfer endpoint to change department".into(),
        ));
    }

    let changes = EmployeeChanges {
        employee_code: payload.employee_id,
        position: payload.position,
        hire_date: payload.hire_date,
        status: payload.status,
    };

    if changes.columns().is_empty() {
        return Ok(HttpResponse::Ok().json(current));
    }

    if !store.update_employee(employee_id, &changes).await? {
        return Err(AppError::not_found("Employee"));
    }

    info!(employee_id, "Employee updated");
    Ok(HttpResponse::Ok().json(load(&store, employee_id).await?))
}

/// Delete Employee (Admin)
///
/// The employee's requests are removed with it. Its workflows stay in the
/// audit trail with `employeeId` cleared.
#[utoipa::path(
    delete,
    path = "/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Employee deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let employee_id = path.into_inner();
    if !store.delete_employee(employee_id).await? {
        return Err(AppError::not_found("Employee"));
    }

    info!(employee_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted" })))
}

/// Transfer employee (Admin)
///
/// Moves the employee, records a pending transfer workflow and reports the
/// resulting head counts of both departments.
#[utoipa::path(
    post,
    path = "/employees/{employee_id}/transfer",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Employee transferred", body = TransferResponse),
        (status = 400, description = "Already in the target department", body = Object, example = json!({
            "message": "Employee is already in this department"
        })),
        (status = 404, description = "Employee or target department not found"),
        (status = 409, description = "Concurrent transfer in progress", body = Object, example = json!({
            "message": "Employee is being transferred by another request, retry"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn transfer_employee(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    payload: web::Json<TransferRequest>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let outcome = engine
        .transfer(TransferCommand {
            employee_id: path.into_inner(),
            department_id: payload.department_id,
            requested_by: Some(auth.account_id),
        })
        .await?;

    Ok(HttpResponse::Ok().json(TransferResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_response_keys_counts_by_department_id() {
        let outcome = TransferOutcome {
            employee_id: 5,
            employee_name: "Jane Doe".into(),
            new_department_name: "Finance".into(),
            workflow_id: 9,
            workflow_type: WorkflowType::Transfer,
            workflow_status: WorkflowStatus::Pending,
            department_counts: BTreeMap::from([(1, 2), (2, 2)]),
        };

        let body = serde_json::to_value(TransferResponse::from(outcome)).unwrap();

        assert_eq!(
            body,
            json!({
                "message": "Employee transferred successfully",
                "employee": { "id": 5, "name": "Jane Doe", "newDepartment": "Finance" },
                "workflow": { "id": 9, "type": "Transfer", "status": "Pending" },
                "departmentCounts": { "1": 2, "2": 2 }
            })
        );
    }

    #[test]
    fn oversized_employee_id_is_rejected() {
        let payload = CreateEmployee {
            employee_id: "X".repeat(21),
            account_id: Some(1),
            department_id: Some(1),
            position: "Engineer".into(),
            hire_date: None,
            status: None,
        };

        assert!(payload.validate().is_err());
    }

    #[test]
    fn blank_employee_id_is_rejected_after_trimming() {
        let payload = CreateEmployee {
            employee_id: "   ".into(),
            account_id: Some(1),
            department_id: Some(1),
            position: "  Engineer ".into(),
            hire_date: None,
            status: None,
        }
        .trimmed();

        assert_eq!(payload.position, "Engineer");
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("employee_id"));
    }

    #[test]
    fn blank_update_values_are_rejected_after_trimming() {
        let payload = UpdateEmployee {
            employee_id: Some(" ".into()),
            position: None,
            hire_date: None,
            status: None,
            department_id: None,
        }
        .trimmed();

        assert!(payload.validate().is_err());
    }
}
