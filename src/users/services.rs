use axum::http::StatusCode;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    common::{
        parse_body,
        validate::{is_valid_email, supplied},
        ApiError, Reply, WithData,
    },
    storage::{from_item, to_item, KeyValueStore, UpdateExpression},
    users::{
        dto::{PublicUser, UserInput},
        password::hash_password,
        repo_types::UserRecord,
    },
};

const RESOURCE: &str = "User";

fn hash(plain: &str) -> Result<String, ApiError> {
    hash_password(plain).map_err(|e| ApiError::Unexpected(e.to_string()))
}

pub async fn create_user(
    store: &dyn KeyValueStore,
    body: Option<&[u8]>,
) -> Result<Reply, ApiError> {
    let input: UserInput =
        parse_body(body).ok_or(ApiError::Validation("Invalid or missing body"))?;

    let (Some(username), Some(email), Some(password)) = (
        supplied(input.username),
        supplied(input.email),
        supplied(input.password),
    ) else {
        warn!("create user: missing required fields");
        return Err(ApiError::Validation("Missing required fields"));
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email"));
    }

    let record = UserRecord {
        id: Uuid::new_v4().to_string(),
        username: Some(username),
        email: Some(email),
        password: Some(hash(&password)?),
    };
    let item = to_item(&record).map_err(ApiError::storage("Error creating user"))?;
    store
        .put(item)
        .await
        .map_err(ApiError::storage("Error creating user"))?;

    info!(user_id = %record.id, "user created");
    Reply::ok(&WithData {
        message: "User created successfully",
        data: PublicUser::from(record),
    })
}

/// Returns one user when `id` is given, otherwise every user in scan order.
pub async fn get_users(store: &dyn KeyValueStore, id: Option<&str>) -> Result<Reply, ApiError> {
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        let item = store
            .get(id)
            .await
            .map_err(ApiError::storage("Error getting user"))?
            .ok_or(ApiError::NotFound(RESOURCE))?;
        let user: UserRecord = from_item(item).map_err(ApiError::storage("Error getting user"))?;
        return Reply::ok(&PublicUser::from(user));
    }

    let users = store
        .scan()
        .await
        .map_err(ApiError::storage("Error getting users"))?
        .into_iter()
        .map(|item| from_item::<UserRecord>(item).map(PublicUser::from))
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(ApiError::storage("Error getting users"))?;
    Reply::ok(&users)
}

pub async fn update_user(
    store: &dyn KeyValueStore,
    id: Option<&str>,
    body: Option<&[u8]>,
) -> Result<Reply, ApiError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::Validation("Missing id"))?;
    let input: UserInput =
        parse_body(body).ok_or(ApiError::Validation("Invalid or missing body"))?;

    let email = supplied(input.email);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            warn!(email = %email, "invalid email");
            return Err(ApiError::Validation("Invalid email"));
        }
    }
    let password = supplied(input.password).map(|p| hash(&p)).transpose()?;

    let update = UpdateExpression::new()
        .set("username", supplied(input.username))
        .set("email", email)
        .set("password", password);
    if update.is_empty() {
        warn!(user_id = %id, "update user: nothing to update");
        return Err(ApiError::Validation("No fields to update"));
    }

    let item = store
        .update(id, &update)
        .await
        .map_err(ApiError::storage("Error updating user"))?;
    let user: UserRecord = from_item(item).map_err(ApiError::storage("Error updating user"))?;

    info!(user_id = %id, "user updated");
    Reply::ok(&WithData {
        message: "User updated successfully",
        data: PublicUser::from(user),
    })
}

pub async fn delete_user(store: &dyn KeyValueStore, id: Option<&str>) -> Result<Reply, ApiError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::Validation("Missing id"))?;
    store
        .delete(id)
        .await
        .map_err(ApiError::storage("Error deleting user"))?;

    info!(user_id = %id, "user deleted");
    Ok(Reply::message(StatusCode::OK, "User deleted successfully"))
}
