use std::sync::Arc;

use crewbase_core::{
    account::AccountStore, db::Database, member::MemberStore, role::RoleStore, task::TaskStore,
    user::UserStore, workspace::WorkspaceStore,
};

use crate::{identity::IdentityService, workspace::WorkspaceService};

#[derive(Clone)]
pub struct AppState {
    pub user_store: UserStore,
    pub account_store: AccountStore,
    pub workspace_store: WorkspaceStore,
    pub role_store: RoleStore,
    pub member_store: MemberStore,
    pub task_store: TaskStore,
    pub identity_service: Arc<IdentityService>,
    pub workspace_service: Arc<WorkspaceService>,
}

pub fn build_state(database: &Database) -> AppState {
    AppState {
        user_store: UserStore::new(database),
        account_store: AccountStore::new(database),
        workspace_store: WorkspaceStore::new(database),
        role_store: RoleStore::new(database),
        member_store: MemberStore::new(database),
        task_store: TaskStore::new(database),
        identity_service: Arc::new(IdentityService::new(database)),
        workspace_service: Arc::new(WorkspaceService::new(database)),
    }
}
