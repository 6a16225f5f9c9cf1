use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::debug;

use crate::{
    db::Database,
    member::{MemberRecord, MemberStore},
    role::{ROLE_OWNER, RoleStore},
    user::{UserRecord, UserStore},
    workspace::{NewWorkspace, WorkspaceRecord, WorkspaceStore},
};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("role {0} not found")]
    RoleNotFound(&'static str),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct ProvisionedWorkspace {
    pub workspace: WorkspaceRecord,
    pub member: MemberRecord,
}

/// Single boundary for every multi-record workspace creation sequence.
///
/// A workspace is only valid together with its first Owner member and the
/// owner's updated current-workspace pointer, so all of those writes go
/// through here on one caller-owned transaction handle. Any failure, most
/// commonly a missing Owner role, leaves the transaction to roll back as a
/// whole; no partial workspace can survive.
#[derive(Clone)]
pub struct WorkspaceProvisioner {
    users: UserStore,
    workspaces: WorkspaceStore,
    roles: RoleStore,
    members: MemberStore,
}

impl WorkspaceProvisioner {
    pub fn new(database: &Database) -> Self {
        Self {
            users: UserStore::new(database),
            workspaces: WorkspaceStore::new(database),
            roles: RoleStore::new(database),
            members: MemberStore::new(database),
        }
    }

    pub async fn provision_in(
        &self,
        conn: &mut SqliteConnection,
        owner: &UserRecord,
        name: &str,
        description: Option<&str>,
    ) -> Result<ProvisionedWorkspace, ProvisionError> {
        let workspace = self
            .workspaces
            .create_in(
                conn,
                NewWorkspace {
                    name,
                    description,
                    owner_id: &owner.id,
                },
            )
            .await?;

        let owner_role = self
            .roles
            .find_by_name_in(conn, ROLE_OWNER)
            .await?
            .ok_or(ProvisionError::RoleNotFound(ROLE_OWNER))?;

        let member = self
            .members
            .create_in(conn, &owner.id, &workspace.id, &owner_role.id)
            .await?;

        self.users
            .set_current_workspace_in(conn, &owner.id, Some(&workspace.id))
            .await?;

        debug!(
            workspace_id = %workspace.id,
            owner_id = %owner.id,
            "provisioned workspace with owner member"
        );

        Ok(ProvisionedWorkspace { workspace, member })
    }
}
