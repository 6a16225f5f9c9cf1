use std::sync::Arc;

use axum::extract::FromRef;
use chrono::Utc;
use crewbase_core::{
    db::Database,
    member::{MemberRecord, MemberStore, MemberWithRole, MemberWithUser},
    provision::WorkspaceProvisioner,
    role::{RoleRecord, RoleStore},
    task::{TaskAnalytics, TaskStore},
    user::UserStore,
    workspace::{WorkspacePatch, WorkspaceRecord, WorkspaceStore},
};
use tracing::info;

use crate::{AppError, state::AppState};

#[derive(Debug, Clone)]
pub struct WorkspaceWithMembers {
    pub workspace: WorkspaceRecord,
    pub members: Vec<MemberWithRole>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceMembers {
    pub members: Vec<MemberWithUser>,
    /// Global role catalog, returned alongside the membership list so callers
    /// can populate a role picker without a second round trip.
    pub roles: Vec<RoleRecord>,
}

pub struct WorkspaceService {
    database: Database,
    user_store: UserStore,
    workspace_store: WorkspaceStore,
    member_store: MemberStore,
    role_store: RoleStore,
    task_store: TaskStore,
    provisioner: WorkspaceProvisioner,
}

impl WorkspaceService {
    pub fn new(database: &Database) -> Self {
        Self {
            database: database.clone(),
            user_store: UserStore::new(database),
            workspace_store: WorkspaceStore::new(database),
            member_store: MemberStore::new(database),
            role_store: RoleStore::new(database),
            task_store: TaskStore::new(database),
            provisioner: WorkspaceProvisioner::new(database),
        }
    }

    pub async fn fetch_workspace(&self, workspace_id: &str) -> Result<WorkspaceRecord, AppError> {
        self.workspace_store
            .find_by_id(workspace_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::workspace_not_found(workspace_id))
    }

    pub async fn ensure_workspace_exists(&self, workspace_id: &str) -> Result<(), AppError> {
        self.fetch_workspace(workspace_id).await.map(|_| ())
    }

    /// Owners and members may act on a workspace; everyone else is rejected.
    pub async fn ensure_member(&self, workspace_id: &str, user_id: &str) -> Result<(), AppError> {
        let workspace = self.fetch_workspace(workspace_id).await?;
        if workspace.owner_id == user_id {
            return Ok(());
        }

        if self
            .member_store
            .find(workspace_id, user_id)
            .await
            .map_err(AppError::from_anyhow)?
            .is_some()
        {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "you are not a member of this workspace",
            ))
        }
    }

    /// Explicit workspace creation goes through the same transactional
    /// provisioning boundary as signup, so the workspace, its Owner member and
    /// the current-workspace pointer appear together or not at all.
    pub async fn create_workspace(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<WorkspaceRecord, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("workspace name must not be empty"));
        }

        let owner = self
            .user_store
            .find_by_id(owner_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::user_not_found(owner_id))?;

        let mut tx = self
            .database
            .pool()
            .begin()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        let provisioned = self
            .provisioner
            .provision_in(&mut tx, &owner, name, description)
            .await
            .map_err(AppError::from_provision)?;

        tx.commit()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        info!(
            workspace_id = %provisioned.workspace.id,
            owner_id = %owner.id,
            "created workspace"
        );

        Ok(provisioned.workspace)
    }

    pub async fn list_workspaces_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<WorkspaceRecord>, AppError> {
        self.workspace_store
            .list_for_user(user_id)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn update_workspace(
        &self,
        workspace_id: &str,
        patch: WorkspacePatch,
    ) -> Result<WorkspaceRecord, AppError> {
        let name = match patch.name {
            Some(name) => {
                let trimmed = name.trim().to_owned();
                if trimmed.is_empty() {
                    return Err(AppError::bad_request("workspace name must not be empty"));
                }
                Some(trimmed)
            }
            None => None,
        };

        self.workspace_store
            .update(
                workspace_id,
                WorkspacePatch {
                    name,
                    description: patch.description,
                },
            )
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::workspace_not_found(workspace_id))
    }

    pub async fn get_workspace_by_id(
        &self,
        workspace_id: &str,
    ) -> Result<WorkspaceWithMembers, AppError> {
        let workspace = self.fetch_workspace(workspace_id).await?;
        let members = self
            .member_store
            .list_with_roles(workspace_id)
            .await
            .map_err(AppError::from_anyhow)?;

        Ok(WorkspaceWithMembers { workspace, members })
    }

    pub async fn get_workspace_members(
        &self,
        workspace_id: &str,
    ) -> Result<WorkspaceMembers, AppError> {
        self.ensure_workspace_exists(workspace_id).await?;

        let members = self
            .member_store
            .list_with_users(workspace_id)
            .await
            .map_err(AppError::from_anyhow)?;
        let roles = self
            .role_store
            .list_all()
            .await
            .map_err(AppError::from_anyhow)?;

        Ok(WorkspaceMembers { members, roles })
    }

    /// Counts are computed as of call time; a task may move between buckets
    /// while the three queries run, which is acceptable for a dashboard read.
    pub async fn get_workspace_analytics(
        &self,
        workspace_id: &str,
    ) -> Result<TaskAnalytics, AppError> {
        self.ensure_workspace_exists(workspace_id).await?;

        let now = Utc::now().timestamp();
        self.task_store
            .analytics(workspace_id, now)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn change_member_role(
        &self,
        workspace_id: &str,
        member_user_id: &str,
        role_id: &str,
    ) -> Result<MemberRecord, AppError> {
        self.ensure_workspace_exists(workspace_id).await?;

        if self
            .role_store
            .find_by_id(role_id)
            .await
            .map_err(AppError::from_anyhow)?
            .is_none()
        {
            return Err(AppError::role_not_found(role_id));
        }

        let updated = self
            .member_store
            .set_role(workspace_id, member_user_id, role_id)
            .await
            .map_err(AppError::from_anyhow)?;
        if !updated {
            return Err(AppError::member_not_found(workspace_id, member_user_id));
        }

        self.member_store
            .find(workspace_id, member_user_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::member_not_found(workspace_id, member_user_id))
    }

    /// Only the owner may delete a workspace. Members and tasks go with it via
    /// cascading deletes; advisory current-workspace pointers are detached in
    /// the same transaction.
    pub async fn delete_workspace(
        &self,
        workspace_id: &str,
        actor_id: &str,
    ) -> Result<(), AppError> {
        let workspace = self.fetch_workspace(workspace_id).await?;
        if workspace.owner_id != actor_id {
            return Err(AppError::forbidden(
                "only the workspace owner can delete a workspace",
            ));
        }

        self.remove_workspace_records(workspace_id).await?;

        info!(workspace_id = %workspace.id, "deleted workspace");
        Ok(())
    }

    /// A workspace vanishing between the ownership check and the delete must
    /// not commit the pointer-clearing update, so the missing-row case is
    /// decided before commit and the transaction rolls back on drop.
    async fn remove_workspace_records(&self, workspace_id: &str) -> Result<(), AppError> {
        let mut tx = self
            .database
            .pool()
            .begin()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        self.user_store
            .clear_current_workspace_in(&mut tx, workspace_id)
            .await
            .map_err(AppError::from_anyhow)?;
        let deleted = self
            .workspace_store
            .delete_in(&mut tx, workspace_id)
            .await
            .map_err(AppError::from_anyhow)?;
        if !deleted {
            return Err(AppError::workspace_not_found(workspace_id));
        }

        tx.commit()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        Ok(())
    }
}

impl FromRef<AppState> for Arc<WorkspaceService> {
    fn from_ref(state: &AppState) -> Arc<WorkspaceService> {
        Arc::clone(&state.workspace_service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{count_rows, register_user, setup_state};
    use axum::http::StatusCode;
    use crewbase_core::task::TaskStatus;

    #[tokio::test]
    async fn registered_workspace_has_one_owner_member() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;
        let registered = register_user(&state, "a@x.com", "Alice", "pw").await;

        let detail = state
            .workspace_service
            .get_workspace_by_id(&registered.workspace_id)
            .await
            .expect("workspace detail");

        assert_eq!(detail.workspace.id, registered.workspace_id);
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].role_name, "Owner");
        assert_eq!(detail.members[0].user_id, registered.user_id);
        Ok(())
    }

    #[tokio::test]
    async fn create_workspace_requires_existing_owner() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;
        let registered = register_user(&state, "a@x.com", "Alice", "pw").await;

        let workspace = state
            .workspace_service
            .create_workspace(&registered.user_id, "Second Space", Some("side project"))
            .await
            .expect("create workspace");
        assert_eq!(workspace.name, "Second Space");

        let listed = state
            .workspace_service
            .list_workspaces_for_user(&registered.user_id)
            .await?;
        assert_eq!(listed.len(), 2);

        let error = state
            .workspace_service
            .create_workspace("ghost", "Nope", None)
            .await
            .expect_err("unknown owner");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn change_member_role_round_trips_and_rejects_non_members() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;
        let registered = register_user(&state, "a@x.com", "Alice", "pw").await;

        let admin = state
            .role_store
            .find_by_name("Admin")
            .await?
            .expect("admin role");

        let member = state
            .workspace_service
            .change_member_role(&registered.workspace_id, &registered.user_id, &admin.id)
            .await
            .expect("change role");
        assert_eq!(member.role_id, admin.id);

        let reloaded = state
            .member_store
            .find(&registered.workspace_id, &registered.user_id)
            .await?
            .expect("member");
        assert_eq!(reloaded.role_id, admin.id);

        let error = state
            .workspace_service
            .change_member_role(&registered.workspace_id, "stranger", &admin.id)
            .await
            .expect_err("non-member");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.name(), "MEMBER_NOT_FOUND");

        let error = state
            .workspace_service
            .change_member_role(&registered.workspace_id, &registered.user_id, "ghost-role")
            .await
            .expect_err("unknown role");
        assert_eq!(error.name(), "ROLE_NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn members_listing_joins_users_and_ships_role_catalog() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;
        let registered = register_user(&state, "a@x.com", "Alice", "pw").await;

        let members = state
            .workspace_service
            .get_workspace_members(&registered.workspace_id)
            .await
            .expect("members");

        assert_eq!(members.members.len(), 1);
        assert_eq!(members.members[0].email, "a@x.com");
        assert_eq!(members.members[0].role_name, "Owner");
        assert_eq!(members.roles.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn analytics_counts_tasks_by_bucket() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;
        let registered = register_user(&state, "a@x.com", "Alice", "pw").await;
        let now = Utc::now().timestamp();

        state
            .task_store
            .create(
                &registered.workspace_id,
                "shipped",
                TaskStatus::Done,
                Some(now - 60),
            )
            .await?;
        state
            .task_store
            .create(
                &registered.workspace_id,
                "late",
                TaskStatus::Todo,
                Some(now - 60),
            )
            .await?;
        state
            .task_store
            .create(
                &registered.workspace_id,
                "upcoming",
                TaskStatus::Todo,
                Some(now + 3_600),
            )
            .await?;

        let analytics = state
            .workspace_service
            .get_workspace_analytics(&registered.workspace_id)
            .await
            .expect("analytics");
        assert_eq!(analytics.total_tasks, 3);
        assert_eq!(analytics.completed_tasks, 1);
        assert_eq!(analytics.overdue_tasks, 1);

        let error = state
            .workspace_service
            .get_workspace_analytics("missing")
            .await
            .expect_err("unknown workspace");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn update_workspace_applies_explicit_patch() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;
        let registered = register_user(&state, "a@x.com", "Alice", "pw").await;

        let updated = state
            .workspace_service
            .update_workspace(
                &registered.workspace_id,
                WorkspacePatch {
                    name: Some("Renamed".into()),
                    description: Some(None),
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.name, "Renamed");
        assert!(updated.description.is_none());

        let error = state
            .workspace_service
            .update_workspace(
                &registered.workspace_id,
                WorkspacePatch {
                    name: Some("   ".into()),
                    description: None,
                },
            )
            .await
            .expect_err("blank name");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn delete_workspace_is_owner_only_and_cascades() -> anyhow::Result<()> {
        let (_guard, database, state) = setup_state().await;
        let alice = register_user(&state, "a@x.com", "Alice", "pw").await;
        let bob = register_user(&state, "b@x.com", "Bob", "pw").await;

        let error = state
            .workspace_service
            .delete_workspace(&alice.workspace_id, &bob.user_id)
            .await
            .expect_err("non-owner");
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);

        state
            .task_store
            .create(&alice.workspace_id, "doomed", TaskStatus::Todo, None)
            .await?;

        state
            .workspace_service
            .delete_workspace(&alice.workspace_id, &alice.user_id)
            .await
            .expect("owner delete");

        assert_eq!(count_rows(database.pool(), "workspaces").await?, 1);
        assert_eq!(count_rows(database.pool(), "tasks").await?, 0);
        let alice_user = state
            .user_store
            .find_by_id(&alice.user_id)
            .await?
            .expect("alice");
        assert!(alice_user.current_workspace.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn vanished_workspace_delete_commits_nothing() -> anyhow::Result<()> {
        let (_guard, database, state) = setup_state().await;
        let alice = register_user(&state, "a@x.com", "Alice", "pw").await;

        let error = state
            .workspace_service
            .remove_workspace_records("missing")
            .await
            .expect_err("unknown workspace");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.name(), "WORKSPACE_NOT_FOUND");

        assert_eq!(count_rows(database.pool(), "workspaces").await?, 1);
        let alice_user = state
            .user_store
            .find_by_id(&alice.user_id)
            .await?
            .expect("alice");
        assert_eq!(
            alice_user.current_workspace.as_deref(),
            Some(alice.workspace_id.as_str())
        );
        Ok(())
    }

    #[tokio::test]
    async fn ensure_member_accepts_members_and_rejects_strangers() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;
        let alice = register_user(&state, "a@x.com", "Alice", "pw").await;
        let bob = register_user(&state, "b@x.com", "Bob", "pw").await;

        state
            .workspace_service
            .ensure_member(&alice.workspace_id, &alice.user_id)
            .await
            .expect("owner is a member");

        let error = state
            .workspace_service
            .ensure_member(&alice.workspace_id, &bob.user_id)
            .await
            .expect_err("stranger");
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        Ok(())
    }
}
