//! Flag endpoint handlers.
//!
//! Reads (`GET`) are open. Mutations require the admin bearer token, are applied to the registry
//! and saved to the snapshot before the response is sent.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use super::{error::ApiError, AppState};
use crate::Flag;

/// Query parameters of GET /flags/{name}.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct EvaluateParams {
    user_id: String,
    region: String,
}

impl EvaluateParams {
    /// Pick `userId` and `region` out of the raw query pairs. A repeated key keeps its first
    /// value, a missing key is empty and unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut user_id = None;
        let mut region = None;
        for (key, value) in pairs {
            match key.as_str() {
                "userId" => {
                    user_id.get_or_insert(value);
                }
                "region" => {
                    region.get_or_insert(value);
                }
                _ => {}
            }
        }

        EvaluateParams {
            user_id: user_id.unwrap_or_default(),
            region: region.unwrap_or_default(),
        }
    }
}

/// Request body for POST and PUT /flags/{name}.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FlagRequest {
    #[serde(default)]
    enabled: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    target_users: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    target_regions: Vec<String>,
}

/// Response body for evaluation, creation and update.
#[derive(Debug, Serialize)]
pub(crate) struct FlagResponse {
    enabled: bool,
    reason: &'static str,
}

/// GET /flags
pub(crate) async fn list_flags(State(app): State<AppState>) -> Json<Vec<Flag>> {
    Json(app.service.list())
}

/// GET /flags/{name}?userId=..&region=..
///
/// Evaluates the flag for the given context. Returns 404 if the flag does not exist.
pub(crate) async fn evaluate_flag(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<FlagResponse>, ApiError> {
    let params = EvaluateParams::from_pairs(pairs);
    let evaluation = app
        .service
        .evaluate(&name, &params.user_id, &params.region)
        .ok_or(ApiError::NotFound("Flag not found"))?;

    Ok(Json(FlagResponse {
        enabled: evaluation.enabled,
        reason: evaluation.reason.as_str(),
    }))
}

/// POST /flags/{name}
///
/// Creates the flag, replacing any flag of the same name. Returns 201.
pub(crate) async fn create_flag(
    State(app): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<FlagResponse>), ApiError> {
    authorize(&app, &headers)?;
    let request = parse_body(&body)?;

    let enabled = request.enabled;
    let flag = Flag {
        name,
        enabled,
        target_users: request.target_users,
        target_regions: request.target_regions,
    };
    let service = app.service.clone();
    tokio::task::spawn_blocking(move || service.create(flag)).await??;

    Ok((
        StatusCode::CREATED,
        Json(FlagResponse {
            enabled,
            reason: "Flag created",
        }),
    ))
}

/// PUT /flags/{name}
///
/// Replaces an existing flag. Returns 404 if the flag does not exist; use POST to create it.
pub(crate) async fn update_flag(
    State(app): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FlagResponse>, ApiError> {
    authorize(&app, &headers)?;
    let request = parse_body(&body)?;

    let enabled = request.enabled;
    let service = app.service.clone();
    let updated = tokio::task::spawn_blocking(move || {
        service.update(
            &name,
            request.enabled,
            request.target_users,
            request.target_regions,
        )
    })
    .await??;

    if !updated {
        return Err(ApiError::NotFound("Flag not found. Use POST to create."));
    }

    Ok(Json(FlagResponse {
        enabled,
        reason: "Flag updated",
    }))
}

/// DELETE /flags/{name}
///
/// Returns 204, or 404 if the flag does not exist.
pub(crate) async fn delete_flag(
    State(app): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authorize(&app, &headers)?;

    let service = app.service.clone();
    let deleted = tokio::task::spawn_blocking(move || service.delete(&name)).await??;

    if !deleted {
        return Err(ApiError::NotFound("Flag not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Any request to /flags/ without a flag name.
pub(crate) async fn missing_flag_name() -> ApiError {
    ApiError::BadRequest("Missing flag name")
}

fn authorize(app: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if app.config.is_authorized(header) {
        Ok(())
    } else {
        log::warn!(target: "flagpole", "rejected unauthorized flag mutation");
        Err(ApiError::Unauthorized)
    }
}

fn parse_body(body: &[u8]) -> Result<FlagRequest, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        log::debug!(target: "flagpole", "invalid flag request body: {:?}", err);
        ApiError::BadRequest("Invalid JSON")
    })
}
