use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[schema(example = "Ms")]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip)]
    pub verification_token: Option<String>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub verified: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[schema(value_type = String, format = DateTime)]
    pub created: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_verified(&self) -> bool {
        self.verified.is_some()
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            email: self.email.clone(),
            title: self.title.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            is_active: self.is_active,
        }
    }
}

/// The account fields embedded in employee responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: u64,
    pub email: String,
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl AccountSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub verification_token: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub account_id: u64,
    pub revoked: bool,
}
