use serde::{Deserialize, Serialize};

use crate::users::repo_types::UserRecord;

/// Request body for create and update. Every field is optional here;
/// create enforces presence itself.
#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
    #[serde(alias = "name")]
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A user as returned to callers; has no password field.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<UserRecord> for PublicUser {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
        }
    }
}
