use crewbase_core::{
    member::{MemberWithRole, MemberWithUser},
    role::RoleRecord,
    task::TaskAnalytics,
    user::UserRecord,
    workspace::{WorkspacePatch, WorkspaceRecord},
};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
    pub workspace_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User shape returned over the wire. The password hash never leaves the
/// service layer, so it has no field here at all.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub current_workspace: Option<String>,
    pub created_at: i64,
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            current_workspace: user.current_workspace.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePayload {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: i64,
}

impl From<&WorkspaceRecord> for WorkspacePayload {
    fn from(workspace: &WorkspaceRecord) -> Self {
        Self {
            id: workspace.id.clone(),
            name: workspace.name.clone(),
            description: workspace.description.clone(),
            owner_id: workspace.owner_id.clone(),
            created_at: workspace.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Patch body where an absent `description` keeps the stored value and an
/// explicit `"description": null` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkspaceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl UpdateWorkspaceRequest {
    pub fn into_patch(self) -> WorkspacePatch {
        WorkspacePatch {
            name: self.name,
            description: self.description,
        }
    }
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMemberRoleRequest {
    pub member_id: String,
    pub role_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    pub user_id: String,
    pub workspace_id: String,
    pub role_id: String,
    pub role_name: String,
    pub joined_at: i64,
}

impl From<&MemberWithRole> for MemberPayload {
    fn from(member: &MemberWithRole) -> Self {
        Self {
            user_id: member.user_id.clone(),
            workspace_id: member.workspace_id.clone(),
            role_id: member.role_id.clone(),
            role_name: member.role_name.clone(),
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUserPayload {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub role_id: String,
    pub role_name: String,
    pub joined_at: i64,
}

impl From<&MemberWithUser> for MemberUserPayload {
    fn from(member: &MemberWithUser) -> Self {
        Self {
            user_id: member.user_id.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
            picture: member.picture.clone(),
            role_id: member.role_id.clone(),
            role_name: member.role_name.clone(),
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePayload {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<&RoleRecord> for RolePayload {
    fn from(role: &RoleRecord) -> Self {
        Self {
            id: role.id.clone(),
            name: role.name.clone(),
            permissions: role.permissions.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPayload {
    pub total_tasks: i64,
    pub overdue_tasks: i64,
    pub completed_tasks: i64,
}

impl From<TaskAnalytics> for AnalyticsPayload {
    fn from(analytics: TaskAnalytics) -> Self {
        Self {
            total_tasks: analytics.total_tasks,
            overdue_tasks: analytics.overdue_tasks,
            completed_tasks: analytics.completed_tasks,
        }
    }
}
