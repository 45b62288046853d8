use crate::api::{
    error::ApiError,
    handlers::{required, valid_email, Message},
    password,
    store::UserStore,
};
use anyhow::Context;
use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

pub const INVALID_ADMIN_FLAG: &str = "Invalid value for isAdmin. It must be 0 or 1.";
pub const MAX_NAME_LENGTH: usize = 255;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserRegister {
    email: Option<String>,
    password: Option<String>,
    /// Display name returned by the profile endpoints.
    name: Option<String>,
    /// `0` for a regular user, `1` for an administrator.
    #[serde(rename = "isAdmin")]
    #[schema(value_type = Option<i64>)]
    is_admin: Option<Value>,
}

impl fmt::Debug for UserRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRegister")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "*****"))
            .field("name", &self.name)
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

/// Only the integers 0 and 1 are accepted; `true`, `"1"` or `1.0` are not.
fn admin_flag(value: Option<&Value>) -> Option<bool> {
    match value.and_then(Value::as_i64) {
        Some(0) => Some(false),
        Some(1) => Some(true),
        _ => None,
    }
}

#[utoipa::path(
    post,
    path= "/profile",
    request_body = UserRegister,
    responses (
        (status = 200, description = "User registered successfully", body = Message, content_type = "application/json"),
        (status = 400, description = "Missing email or password, invalid name or isAdmin", body = Message),
        (status = 500, description = "Registration failed", body = Message),
    ),
    tag= "profile"
)]
// axum handler for registration
#[instrument(skip(store))]
pub async fn register(
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<UserRegister>>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Some(Json(user)) = payload else {
        return Err(ApiError::bad_request("Missing payload"));
    };

    debug!("user: {:?}", user);

    let (Some(email), Some(plain)) = (required(user.email), required(user.password)) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    if !valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    let name = required(user.name);
    if name
        .as_ref()
        .is_some_and(|name| name.chars().count() > MAX_NAME_LENGTH)
    {
        return Err(ApiError::bad_request("Invalid name"));
    }

    let Some(is_admin) = admin_flag(user.is_admin.as_ref()) else {
        return Err(ApiError::bad_request(INVALID_ADMIN_FLAG));
    };

    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .context("password hashing task failed")??;

    if store
        .insert_user_and_role(&email, &password_hash, name.as_deref(), is_admin)
        .await?
    {
        debug!("User registered");

        Ok((
            StatusCode::OK,
            Json(Message::new("User registered successfully")),
        ))
    } else {
        error!("insert_user_and_role reported failure");

        Err(ApiError::Failed("Failed to register user".to_string()))
    }
}
