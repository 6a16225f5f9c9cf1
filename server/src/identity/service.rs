use std::sync::Arc;

use axum::extract::FromRef;
use crewbase_core::{
    account::{AccountStore, Provider},
    db::Database,
    provision::{ProvisionedWorkspace, WorkspaceProvisioner},
    user::{NewUser, UserRecord, UserStore},
    workspace::DEFAULT_WORKSPACE_NAME,
};
use sqlx::SqliteConnection;
use tracing::info;

use crate::{
    AppError,
    auth::{generate_password_hash, verify_password},
    state::AppState,
    utils::db::is_unique_violation,
};

#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user_id: String,
    pub workspace_id: String,
}

/// Identity resolved by an upstream OAuth exchange; this service only receives
/// the result.
#[derive(Debug, Clone, Copy)]
pub struct ExternalLogin<'a> {
    pub provider: Provider,
    pub provider_id: &'a str,
    pub display_name: &'a str,
    pub email: Option<&'a str>,
    pub picture: Option<&'a str>,
}

pub struct IdentityService {
    database: Database,
    user_store: UserStore,
    account_store: AccountStore,
    provisioner: WorkspaceProvisioner,
}

impl IdentityService {
    pub fn new(database: &Database) -> Self {
        Self {
            database: database.clone(),
            user_store: UserStore::new(database),
            account_store: AccountStore::new(database),
            provisioner: WorkspaceProvisioner::new(database),
        }
    }

    /// Signup with a local password. User, Account, Workspace, Member and the
    /// current-workspace pointer are written in one transaction; any failure
    /// rolls the whole sequence back.
    pub async fn register_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<RegisteredUser, AppError> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() {
            return Err(AppError::bad_request("email must not be empty"));
        }
        if name.is_empty() {
            return Err(AppError::bad_request("name must not be empty"));
        }
        if password.is_empty() {
            return Err(AppError::bad_request("password must not be empty"));
        }

        if self
            .user_store
            .find_by_email(email)
            .await
            .map_err(AppError::from_anyhow)?
            .is_some()
        {
            return Err(AppError::email_taken());
        }

        let password_hash =
            generate_password_hash(password).map_err(|err| AppError::internal(err.into()))?;

        let mut tx = self
            .database
            .pool()
            .begin()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        let user = match self
            .user_store
            .create_in(
                &mut tx,
                NewUser {
                    email,
                    name,
                    password_hash: Some(&password_hash),
                    picture: None,
                },
            )
            .await
        {
            Ok(user) => user,
            Err(err) if is_unique_violation(&err) => return Err(AppError::email_taken()),
            Err(err) => return Err(AppError::from_anyhow(err)),
        };

        self.account_store
            .create_in(&mut tx, &user.id, Provider::Email, email)
            .await
            .map_err(AppError::from_anyhow)?;

        let provisioned = self.provision_default_workspace(&mut tx, &user).await?;

        tx.commit()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        info!(
            user_id = %user.id,
            workspace_id = %provisioned.workspace.id,
            "registered user with default workspace"
        );

        Ok(RegisteredUser {
            user_id: user.id,
            workspace_id: provisioned.workspace.id,
        })
    }

    /// Resolve or create the User behind an external login. An existing
    /// account binding, or an existing user with the same email, short-cuts to
    /// a plain read; otherwise the full provisioning transaction runs.
    pub async fn login_or_create_account(
        &self,
        login: ExternalLogin<'_>,
    ) -> Result<UserRecord, AppError> {
        if let Some(account) = self
            .account_store
            .find_by_provider(login.provider, login.provider_id)
            .await
            .map_err(AppError::from_anyhow)?
        {
            let user = self
                .user_store
                .find_by_id(&account.user_id)
                .await
                .map_err(AppError::from_anyhow)?
                .ok_or_else(|| AppError::user_not_found(&account.user_id))?;
            return Ok(user.sanitized());
        }

        let email = login.email.map(str::trim).filter(|email| !email.is_empty());

        if let Some(email) = email {
            if let Some(user) = self
                .user_store
                .find_by_email(email)
                .await
                .map_err(AppError::from_anyhow)?
            {
                // Existing account and workspace state is not re-validated.
                return Ok(user.sanitized());
            }
        }

        let Some(email) = email else {
            return Err(AppError::bad_request(
                "email is required to create an account",
            ));
        };

        let mut tx = self
            .database
            .pool()
            .begin()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        let user = match self
            .user_store
            .create_in(
                &mut tx,
                NewUser {
                    email,
                    name: login.display_name,
                    password_hash: None,
                    picture: login.picture,
                },
            )
            .await
        {
            Ok(user) => user,
            Err(err) if is_unique_violation(&err) => return Err(AppError::email_taken()),
            Err(err) => return Err(AppError::from_anyhow(err)),
        };

        self.account_store
            .create_in(&mut tx, &user.id, login.provider, login.provider_id)
            .await
            .map_err(AppError::from_anyhow)?;

        let provisioned = self.provision_default_workspace(&mut tx, &user).await?;

        tx.commit()
            .await
            .map_err(|err| AppError::internal(err.into()))?;

        info!(
            user_id = %user.id,
            provider = login.provider.as_str(),
            workspace_id = %provisioned.workspace.id,
            "created user from external login"
        );

        Ok(UserRecord {
            current_workspace: Some(provisioned.workspace.id),
            ..user
        })
    }

    /// Credential check against the stored argon2 hash. The returned record
    /// never carries the hash.
    pub async fn verify_user(
        &self,
        email: &str,
        password: &str,
        provider: Provider,
    ) -> Result<UserRecord, AppError> {
        let account = self
            .account_store
            .find_by_provider(provider, email)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::not_found("invalid email or password"))?;

        let user = self
            .user_store
            .find_by_id(&account.user_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::user_not_found(&account.user_id))?;

        let Some(stored_hash) = user.password_hash.as_deref().filter(|hash| !hash.is_empty())
        else {
            return Err(AppError::invalid_credentials());
        };

        match verify_password(stored_hash, password) {
            Ok(true) => Ok(user.sanitized()),
            Ok(false) => Err(AppError::invalid_credentials()),
            Err(err) => Err(AppError::internal(err.into())),
        }
    }

    pub async fn verify_user_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self
            .user_store
            .find_by_id(user_id)
            .await
            .map_err(AppError::from_anyhow)?
            .map(UserRecord::sanitized))
    }

    async fn provision_default_workspace(
        &self,
        conn: &mut SqliteConnection,
        user: &UserRecord,
    ) -> Result<ProvisionedWorkspace, AppError> {
        let description = format!("Workspace created for {}", user.name);
        self.provisioner
            .provision_in(conn, user, DEFAULT_WORKSPACE_NAME, Some(&description))
            .await
            .map_err(AppError::from_provision)
    }
}

impl FromRef<AppState> for Arc<IdentityService> {
    fn from_ref(state: &AppState) -> Arc<IdentityService> {
        Arc::clone(&state.identity_service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{count_rows, setup_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn register_creates_exactly_one_of_each_record() -> anyhow::Result<()> {
        let (_guard, database, state) = setup_state().await;

        let registered = state
            .identity_service
            .register_user("a@x.com", "Alice", "pw")
            .await
            .expect("register");

        for table in ["users", "accounts", "workspaces", "members"] {
            assert_eq!(count_rows(database.pool(), table).await?, 1, "{table}");
        }

        let user = state
            .user_store
            .find_by_email("a@x.com")
            .await?
            .expect("user");
        assert_eq!(user.id, registered.user_id);
        assert_eq!(
            user.current_workspace.as_deref(),
            Some(registered.workspace_id.as_str())
        );

        let workspace = state
            .workspace_store
            .find_by_id(&registered.workspace_id)
            .await?
            .expect("workspace");
        assert_eq!(workspace.name, DEFAULT_WORKSPACE_NAME);
        assert_eq!(
            workspace.description.as_deref(),
            Some("Workspace created for Alice")
        );
        Ok(())
    }

    #[tokio::test]
    async fn register_rolls_back_when_owner_role_is_missing() -> anyhow::Result<()> {
        let (_guard, database, state) = setup_state().await;
        sqlx::query("DELETE FROM roles")
            .execute(database.pool())
            .await?;

        let error = state
            .identity_service
            .register_user("a@x.com", "Alice", "pw")
            .await
            .expect_err("register must fail");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.name(), "ROLE_NOT_FOUND");

        for table in ["users", "accounts", "workspaces", "members"] {
            assert_eq!(count_rows(database.pool(), table).await?, 0, "{table}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_without_new_records() -> anyhow::Result<()> {
        let (_guard, database, state) = setup_state().await;

        state
            .identity_service
            .register_user("a@x.com", "Alice", "pw")
            .await
            .expect("first register");

        let error = state
            .identity_service
            .register_user("a@x.com", "Impostor", "other")
            .await
            .expect_err("duplicate register must fail");
        assert_eq!(error.status_code(), StatusCode::CONFLICT);

        for table in ["users", "accounts", "workspaces", "members"] {
            assert_eq!(count_rows(database.pool(), table).await?, 1, "{table}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn external_login_is_idempotent_for_known_binding() -> anyhow::Result<()> {
        let (_guard, database, state) = setup_state().await;

        let login = ExternalLogin {
            provider: Provider::Google,
            provider_id: "google-123",
            display_name: "Alice",
            email: Some("a@x.com"),
            picture: Some("https://example.com/a.png"),
        };

        let first = state
            .identity_service
            .login_or_create_account(login)
            .await
            .expect("first login");
        assert!(first.current_workspace.is_some());
        assert!(first.password_hash.is_none());

        let second = state
            .identity_service
            .login_or_create_account(login)
            .await
            .expect("second login");
        assert_eq!(second.id, first.id);

        for table in ["users", "accounts", "workspaces", "members"] {
            assert_eq!(count_rows(database.pool(), table).await?, 1, "{table}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn external_login_reuses_user_matched_by_email() -> anyhow::Result<()> {
        let (_guard, database, state) = setup_state().await;

        let registered = state
            .identity_service
            .register_user("a@x.com", "Alice", "pw")
            .await
            .expect("register");

        let user = state
            .identity_service
            .login_or_create_account(ExternalLogin {
                provider: Provider::Google,
                provider_id: "google-123",
                display_name: "Alice G",
                email: Some("a@x.com"),
                picture: None,
            })
            .await
            .expect("login");

        // No-op read: no second account or workspace appears.
        assert_eq!(user.id, registered.user_id);
        assert_eq!(count_rows(database.pool(), "accounts").await?, 1);
        assert_eq!(count_rows(database.pool(), "workspaces").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn external_login_without_email_is_rejected_for_new_users() {
        let (_guard, _database, state) = setup_state().await;

        let error = state
            .identity_service
            .login_or_create_account(ExternalLogin {
                provider: Provider::Github,
                provider_id: "gh-1",
                display_name: "Ghost",
                email: None,
                picture: None,
            })
            .await
            .expect_err("must fail");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_user_checks_credentials_and_strips_hash() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;

        state
            .identity_service
            .register_user("a@x.com", "Alice", "pw")
            .await
            .expect("register");

        let verified = state
            .identity_service
            .verify_user("a@x.com", "pw", Provider::Email)
            .await
            .expect("verify");
        assert!(verified.password_hash.is_none());
        assert_eq!(verified.email, "a@x.com");

        let mismatch = state
            .identity_service
            .verify_user("a@x.com", "wrong", Provider::Email)
            .await
            .expect_err("wrong password");
        assert_eq!(mismatch.status_code(), StatusCode::UNAUTHORIZED);

        let unknown = state
            .identity_service
            .verify_user("nobody@x.com", "pw", Provider::Email)
            .await
            .expect_err("unknown account");
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn verify_user_by_id_returns_none_for_unknown_id() -> anyhow::Result<()> {
        let (_guard, _database, state) = setup_state().await;

        let registered = state
            .identity_service
            .register_user("a@x.com", "Alice", "pw")
            .await
            .expect("register");

        let found = state
            .identity_service
            .verify_user_by_id(&registered.user_id)
            .await?
            .expect("user");
        assert!(found.password_hash.is_none());

        assert!(
            state
                .identity_service
                .verify_user_by_id("missing")
                .await?
                .is_none()
        );
        Ok(())
    }
}
