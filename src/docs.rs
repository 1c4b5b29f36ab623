use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::department::{CreateDepartment, UpdateDepartment};
use crate::api::employee::{
    CreateEmployee, TransferRequest, TransferResponse, TransferredEmployee, UpdateEmployee,
    WorkflowRef,
};
use crate::api::request::CreateRequest;
use crate::api::status::StatusResponse;
use crate::auth::handlers::{AuthenticateRequest, RegisterRequest, TokenResponse};
use crate::model::{
    account::{Account, AccountSummary},
    department::{Department, DepartmentSummary},
    employee::{Employee, EmployeeDetail, EmployeeStatus},
    request::{Request, RequestDetail, RequestItem},
    role::Role,
    workflow::{Workflow, WorkflowStatus, WorkflowType},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Management API",
        version = "1.0.0",
        description = r#"
## Employee Management Service

Manages accounts, departments, employees and the workflow audit trail of
their employment changes.

### Key Features
- **Accounts**: registration, email verification, JWT login with refresh token rotation
- **Departments**: CRUD with live head counts
- **Employees**: onboarding and department transfers, each recorded as a workflow
- **Workflows**: audit trail with approve/reject of pending entries
- **Requests**: employee requests with line items

### Maintenance mode
When the database cannot be reached at startup the service keeps running and
answers business endpoints with `503`. `GET /api/status` reports the mode.

### Security
Business endpoints require a **JWT Bearer** access token; writes require the
**Admin** role.
"#,
    ),
    paths(
        crate::api::status::service_status,

        crate::auth::handlers::register,
        crate::auth::handlers::authenticate,
        crate::api::account::list_accounts,
        crate::api::account::verify_email,

        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::transfer_employee,

        crate::api::workflow::list_workflows,
        crate::api::workflow::get_workflow,
        crate::api::workflow::approve_workflow,
        crate::api::workflow::reject_workflow,

        crate::api::request::list_requests,
        crate::api::request::get_request,
        crate::api::request::create_request,
        crate::api::request::delete_request
    ),
    components(
        schemas(
            StatusResponse,
            RegisterRequest,
            AuthenticateRequest,
            TokenResponse,
            Account,
            AccountSummary,
            Role,
            Department,
            DepartmentSummary,
            CreateDepartment,
            UpdateDepartment,
            Employee,
            EmployeeDetail,
            EmployeeStatus,
            CreateEmployee,
            UpdateEmployee,
            TransferRequest,
            TransferResponse,
            TransferredEmployee,
            WorkflowRef,
            Workflow,
            WorkflowType,
            WorkflowStatus,
            Request,
            RequestItem,
            RequestDetail,
            CreateRequest
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Status", description = "Service connectivity"),
        (name = "Account", description = "Registration and authentication APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Employee", description = "Employee onboarding and transfer APIs"),
        (name = "Workflow", description = "Employment change audit trail"),
        (name = "Request", description = "Employee request APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_transfer_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/employees/{employee_id}/transfer"));
        assert!(doc.paths.paths.contains_key("/api/status"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
