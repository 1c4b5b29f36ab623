use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
pub enum Role {
    Admin,
    User,
}

impl TryFrom<String> for Role {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Role {
    /// The first account administers the rest.
    pub fn for_new_account(existing_accounts: i64) -> Self {
        if existing_accounts == 0 {
            Role::Admin
        } else {
            Role::User
        }
    }
}
