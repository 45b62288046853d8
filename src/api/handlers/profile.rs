//! Read-only profile lookups and the ELO update.

use crate::api::{
    error::ApiError,
    handlers::{parse_uuid, required, Message},
    store::{Profile, UserStore},
};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

pub const PROFILE_NOT_FOUND: &str = "Profile not found";
pub const NAME_NOT_FOUND: &str = "Not Found";
pub const NAME_ERROR: &str = "Error retrieving name";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProfileFound {
    message: String,
    content: Profile,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct NamesRequest {
    #[serde(default)]
    data: Option<Vec<String>>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Names {
    message: String,
    /// Requested uuid → name, `Not Found` or `Error retrieving name`.
    content: BTreeMap<String, String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EloUpdate {
    uuid: Option<String>,
    elo: Option<i64>,
}

#[utoipa::path(
    get,
    path= "/profile/{uuid}",
    params(("uuid" = String, Path, description = "User UUID")),
    responses (
        (status = 200, description = "Profile found", body = ProfileFound, content_type = "application/json"),
        (status = 400, description = "Invalid UUID", body = Message),
        (status = 404, description = "Profile not found", body = Message),
    ),
    tag= "profile"
)]
// axum handler for profile lookup
#[instrument(skip(store))]
pub async fn profile(
    store: Extension<Arc<dyn UserStore>>,
    Path(uuid): Path<String>,
) -> Result<Json<ProfileFound>, ApiError> {
    let uuid = parse_uuid(&uuid)?;

    match store.profile(uuid).await? {
        Some(profile) => Ok(Json(ProfileFound {
            message: "Profile found".to_string(),
            content: profile,
        })),
        None => Err(ApiError::NotFound(PROFILE_NOT_FOUND.to_string())),
    }
}

#[utoipa::path(
    post,
    path= "/profile/names",
    request_body = NamesRequest,
    responses (
        (status = 200, description = "Names retrieved successfully", body = Names, content_type = "application/json"),
    ),
    tag= "profile"
)]
// axum handler for batch name lookup
#[instrument(skip(store))]
pub async fn names(
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<NamesRequest>>,
) -> Json<Names> {
    let uuids = payload
        .and_then(|Json(request)| request.data)
        .unwrap_or_default();

    let mut content = BTreeMap::new();

    // one lookup per uuid; a failure only affects its own entry
    for raw in uuids {
        let name = match parse_uuid(&raw) {
            Err(_) => NAME_NOT_FOUND.to_string(),
            Ok(uuid) => match store.name(uuid).await {
                Ok(Some(name)) => name,
                Ok(None) => NAME_NOT_FOUND.to_string(),
                Err(err) => {
                    error!("Failed to retrieve name for {uuid}: {err:#}");
                    NAME_ERROR.to_string()
                }
            },
        };
        content.insert(raw, name);
    }

    Json(Names {
        message: "Names retrieved successfully".to_string(),
        content,
    })
}

#[utoipa::path(
    put,
    path= "/profile/elo",
    request_body = EloUpdate,
    responses (
        (status = 200, description = "User ELO updated successfully", body = Message, content_type = "application/json"),
        (status = 400, description = "Missing UUID or invalid ELO", body = Message),
        (status = 404, description = "Profile not found", body = Message),
    ),
    tag= "profile"
)]
// axum handler for the ELO update
#[instrument(skip(store))]
pub async fn update_elo(
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<EloUpdate>>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Some(Json(update)) = payload else {
        return Err(ApiError::bad_request("Missing payload"));
    };

    let Some(uuid) = required(update.uuid) else {
        return Err(ApiError::bad_request("UUID is required"));
    };
    let uuid = parse_uuid(&uuid)?;

    let Some(elo) = update
        .elo
        .filter(|elo| *elo >= 0)
        .and_then(|elo| i32::try_from(elo).ok())
    else {
        return Err(ApiError::bad_request("Invalid or missing ELO"));
    };

    if store.update_elo(uuid, elo).await? {
        debug!("ELO updated");

        Ok((
            StatusCode::OK,
            Json(Message::new("User ELO updated successfully")),
        ))
    } else {
        Err(ApiError::NotFound(PROFILE_NOT_FOUND.to_string()))
    }
}
