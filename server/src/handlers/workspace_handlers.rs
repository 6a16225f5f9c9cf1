use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};

use crate::{
    AppError, AppState,
    auth::require_actor,
    types::{
        AnalyticsPayload, ChangeMemberRoleRequest, CreateWorkspaceRequest, MemberPayload,
        MemberUserPayload, RolePayload, UpdateWorkspaceRequest, WorkspacePayload,
    },
};

pub async fn create_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspacePayload>), AppError> {
    let actor_id = require_actor(&headers)?;
    let workspace = state
        .workspace_service
        .create_workspace(&actor_id, &body.name, body.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(WorkspacePayload::from(&workspace))))
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<WorkspacePayload>>, AppError> {
    let actor_id = require_actor(&headers)?;
    let workspaces = state
        .workspace_service
        .list_workspaces_for_user(&actor_id)
        .await?;

    Ok(Json(workspaces.iter().map(WorkspacePayload::from).collect()))
}

pub async fn get_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let actor_id = require_actor(&headers)?;
    state
        .workspace_service
        .ensure_member(&workspace_id, &actor_id)
        .await?;

    let detail = state
        .workspace_service
        .get_workspace_by_id(&workspace_id)
        .await?;

    Ok(Json(json!({
        "workspace": WorkspacePayload::from(&detail.workspace),
        "members": detail.members.iter().map(MemberPayload::from).collect::<Vec<_>>(),
    })))
}

pub async fn get_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let actor_id = require_actor(&headers)?;
    state
        .workspace_service
        .ensure_member(&workspace_id, &actor_id)
        .await?;

    let members = state
        .workspace_service
        .get_workspace_members(&workspace_id)
        .await?;

    Ok(Json(json!({
        "members": members.members.iter().map(MemberUserPayload::from).collect::<Vec<_>>(),
        "roles": members.roles.iter().map(RolePayload::from).collect::<Vec<_>>(),
    })))
}

pub async fn get_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
) -> Result<Json<AnalyticsPayload>, AppError> {
    let actor_id = require_actor(&headers)?;
    state
        .workspace_service
        .ensure_member(&workspace_id, &actor_id)
        .await?;

    let analytics = state
        .workspace_service
        .get_workspace_analytics(&workspace_id)
        .await?;

    Ok(Json(AnalyticsPayload::from(analytics)))
}

pub async fn update_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
    Json(body): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspacePayload>, AppError> {
    let actor_id = require_actor(&headers)?;
    state
        .workspace_service
        .ensure_member(&workspace_id, &actor_id)
        .await?;

    let workspace = state
        .workspace_service
        .update_workspace(&workspace_id, body.into_patch())
        .await?;

    Ok(Json(WorkspacePayload::from(&workspace)))
}

pub async fn delete_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let actor_id = require_actor(&headers)?;
    state
        .workspace_service
        .delete_workspace(&workspace_id, &actor_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_member_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
    Json(body): Json<ChangeMemberRoleRequest>,
) -> Result<Json<Value>, AppError> {
    let actor_id = require_actor(&headers)?;
    state
        .workspace_service
        .ensure_member(&workspace_id, &actor_id)
        .await?;

    let member = state
        .workspace_service
        .change_member_role(&workspace_id, &body.member_id, &body.role_id)
        .await?;

    Ok(Json(json!({
        "userId": member.user_id,
        "workspaceId": member.workspace_id,
        "roleId": member.role_id,
        "joinedAt": member.joined_at,
    })))
}
