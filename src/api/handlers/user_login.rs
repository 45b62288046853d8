use crate::api::{
    error::ApiError,
    handlers::{required, Message},
    password,
    store::UserStore,
};
use anyhow::Context;
use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserLogin {
    email: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserLogin")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "*****"))
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LoginSuccess {
    message: String,
    email: String,
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful", body = LoginSuccess, content_type = "application/json"),
        (status = 400, description = "Missing email or password", body = Message),
        (status = 401, description = "Invalid email or password", body = Message),
        (status = 500, description = "Internal server error", body = Message),
    ),
    tag= "login"
)]
// axum handler for login
#[instrument(skip(store))]
pub async fn login(
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<UserLogin>>,
) -> Result<(StatusCode, Json<LoginSuccess>), ApiError> {
    let Some(Json(user)) = payload else {
        return Err(ApiError::bad_request("Missing payload"));
    };

    debug!("user: {:?}", user);

    let (Some(email), Some(plain)) = (required(user.email), required(user.password)) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let stored = store.hashed_password(&email).await?;

    let matched = tokio::task::spawn_blocking(move || match stored {
        Some(hash) => password::verify_password(&plain, &hash),
        None => {
            password::verify_dummy(&plain);
            false
        }
    })
    .await
    .context("password verification task failed")?;

    if !matched {
        debug!("Unauthorized");

        return Err(ApiError::Unauthorized);
    }

    store.update_last_login(&email).await?;

    debug!("Login successful");

    Ok((
        StatusCode::OK,
        Json(LoginSuccess {
            message: "Success".to_string(),
            email,
        }),
    ))
}
