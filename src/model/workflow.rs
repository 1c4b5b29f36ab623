use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
pub enum WorkflowType {
    Onboarding,
    Transfer,
    Termination,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
pub enum WorkflowStatus {
    Pending,
    Approved,
    Rejected,
}

impl TryFrom<String> for WorkflowType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for WorkflowStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Append-only audit record of an employment state change.
///
/// Only `status` and `updated` change after insertion.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: u64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: WorkflowType,
    #[sqlx(try_from = "String")]
    pub status: WorkflowStatus,
    /// Cleared when the employee is deleted; the record itself stays
    pub employee_id: Option<u64>,
    /// Destination department
    pub department_id: u64,
    #[schema(value_type = Object)]
    pub details: Json<Value>,
    #[schema(value_type = String, format = DateTime)]
    pub created: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub kind: WorkflowType,
    pub status: WorkflowStatus,
    pub employee_id: u64,
    pub department_id: u64,
    pub details: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detached_workflow_keeps_its_audit_fields() {
        let workflow = Workflow {
            id: 4,
            kind: WorkflowType::Transfer,
            status: WorkflowStatus::Approved,
            employee_id: None,
            department_id: 2,
            details: Json(json!({ "oldDepartmentId": 1, "newDepartmentId": 2 })),
            created: Utc::now(),
            updated: None,
        };

        let body = serde_json::to_value(&workflow).unwrap();

        assert_eq!(body["employeeId"], Value::Null);
        assert_eq!(body["type"], "Transfer");
        assert_eq!(body["details"]["oldDepartmentId"], 1);
    }
}
