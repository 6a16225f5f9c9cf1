use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use crewbase_core::account::Provider;

use crate::{
    AppError, AppState,
    auth::require_actor,
    types::{LoginRequest, PublicUser, RegisterRequest, RegisterResponse},
};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let registered = state
        .identity_service
        .register_user(&body.email, &body.name, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: registered.user_id,
            workspace_id: registered.workspace_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .identity_service
        .verify_user(&body.email, &body.password, Provider::Email)
        .await?;

    Ok(Json(PublicUser::from(&user)))
}

pub async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PublicUser>, AppError> {
    let actor_id = require_actor(&headers)?;
    let user = state
        .identity_service
        .verify_user_by_id(&actor_id)
        .await?
        .ok_or_else(|| AppError::user_not_found(&actor_id))?;

    Ok(Json(PublicUser::from(&user)))
}
