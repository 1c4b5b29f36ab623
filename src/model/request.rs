use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::workflow::WorkflowStatus;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: u64,
    pub employee_id: u64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    #[schema(example = "Equipment")]
    pub kind: String,
    #[sqlx(try_from = "String")]
    pub status: WorkflowStatus,
    #[schema(value_type = String, format = DateTime)]
    pub created: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    #[serde(default, skip_deserializing)]
    pub id: u64,
    #[serde(default, skip_deserializing)]
    pub request_id: u64,
    #[schema(example = "Laptop")]
    pub name: String,
    #[schema(example = 1)]
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: Request,
    pub items: Vec<RequestItem>,
}

pub struct NewRequest {
    pub employee_id: u64,
    pub kind: String,
    pub items: Vec<RequestItem>,
}
