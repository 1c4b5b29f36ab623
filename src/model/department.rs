use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product development", nullable = true)]
    pub description: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub created: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated: Option<DateTime<Utc>>,
}

/// A department together with its current head count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub department: Department,
    #[schema(example = 4)]
    pub employee_count: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DepartmentRemoval {
    Deleted,
    NotFound,
    HasEmployees(i64),
}
