use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::{account::AccountSummary, department::Department, role::Role};
use crate::utils::db_utils::SqlValue;

#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}

impl TryFrom<String> for EmployeeStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "employeeId": "EMP-001",
        "accountId": 3,
        "departmentId": 10,
        "position": "Software Engineer",
        "hireDate": "2024-01-01",
        "status": "Active",
        "version": 0,
        "created": "2024-01-01T08:00:00Z",
        "updated": null
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    /// Business identifier, unique across employees
    #[serde(rename = "employeeId")]
    #[schema(example = "EMP-001")]
    pub employee_code: String,

    pub account_id: u64,

    #[schema(example = 10)]
    pub department_id: u64,

    #[schema(example = "Software Engineer")]
    pub position: String,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    #[sqlx(try_from = "String")]
    pub status: EmployeeStatus,

    /// Bumped on every write; guards transfers against concurrent changes
    pub version: u32,

    #[schema(value_type = String, format = DateTime)]
    pub created: DateTime<Utc>,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated: Option<DateTime<Utc>>,
}

/// Employee with its account and department resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub account: AccountSummary,
    pub department: Department,
}

/// Flat row produced by the employee/account/department join.
#[derive(sqlx::FromRow)]
pub struct EmployeeRow {
    #[sqlx(flatten)]
    pub employee: Employee,
    pub account_email: String,
    pub account_title: Option<String>,
    pub account_first_name: String,
    pub account_last_name: String,
    #[sqlx(try_from = "String")]
    pub account_role: Role,
    pub account_is_active: bool,
    pub department_name: String,
    pub department_description: Option<String>,
    pub department_created: DateTime<Utc>,
    pub department_updated: Option<DateTime<Utc>>,
}

impl From<EmployeeRow> for EmployeeDetail {
    fn from(row: EmployeeRow) -> Self {
        let account = AccountSummary {
            id: row.employee.account_id,
            email: row.account_email,
            title: row.account_title,
            first_name: row.account_first_name,
            last_name: row.account_last_name,
            role: row.account_role,
            is_active: row.account_is_active,
        };
        let department = Department {
            id: row.employee.department_id,
            name: row.department_name,
            description: row.department_description,
            created: row.department_created,
            updated: row.department_updated,
        };

        Self {
            employee: row.employee,
            account,
            department,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub employee_code: String,
    pub account_id: u64,
    pub department_id: u64,
    pub position: String,
    pub hire_date: NaiveDate,
    pub status: EmployeeStatus,
}

/// Partial update of an employee. Department changes go through transfers only.
#[derive(Debug, Default)]
pub struct EmployeeChanges {
    pub employee_code: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<EmployeeStatus>,
}

impl EmployeeChanges {
    pub fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        let mut columns = Vec::new();
        if let Some(code) = &self.employee_code {
            columns.push(("employee_code", SqlValue::String(code.clone())));
        }
        if let Some(position) = &self.position {
            columns.push(("position", SqlValue::String(position.clone())));
        }
        if let Some(hire_date) = self.hire_date {
            columns.push(("hire_date", SqlValue::Date(hire_date)));
        }
        if let Some(status) = self.status {
            columns.push(("status", SqlValue::String(status.to_string())));
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_only_emit_supplied_columns() {
        let changes = EmployeeChanges {
            position: Some("Lead".into()),
            status: Some(EmployeeStatus::Inactive),
            ..Default::default()
        };

        let names: Vec<_> = changes.columns().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["position", "status"]);
    }
}
