use std::fmt;

use anyhow::Error as AnyError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crewbase_core::provision::ProvisionError;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tracing::error;

#[derive(Debug, Clone, Copy)]
struct ErrorDescriptor {
    status: StatusCode,
    name: &'static str,
    default_message: &'static str,
}

const BAD_REQUEST_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::BAD_REQUEST,
    name: "VALIDATION_ERROR",
    default_message: "Bad request.",
};

const UNAUTHORIZED_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::UNAUTHORIZED,
    name: "AUTHENTICATION_REQUIRED",
    default_message: "You must sign in first to access this resource.",
};

const FORBIDDEN_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::FORBIDDEN,
    name: "ACTION_FORBIDDEN",
    default_message: "Action forbidden.",
};

const NOT_FOUND_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::NOT_FOUND,
    name: "RESOURCE_NOT_FOUND",
    default_message: "Resource not found.",
};

const CONFLICT_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::CONFLICT,
    name: "RESOURCE_ALREADY_EXISTS",
    default_message: "Resource already exists.",
};

const INTERNAL_SERVER_ERROR_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::INTERNAL_SERVER_ERROR,
    name: "INTERNAL_SERVER_ERROR",
    default_message: "An internal error occurred.",
};

/// Closed application error set: Validation, Unauthorized, Forbidden,
/// NotFound, Conflict plus an Internal catch-all. Services construct these and
/// propagate them unmodified; the HTTP layer renders them as a stable JSON
/// payload.
#[derive(Debug)]
pub struct AppError {
    descriptor: &'static ErrorDescriptor,
    name: String,
    message: String,
    data: Option<JsonValue>,
    source: Option<AnyError>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_descriptor(&BAD_REQUEST_DESCRIPTOR, Some(message.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::from_descriptor(&UNAUTHORIZED_DESCRIPTOR, Some(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::from_descriptor(&FORBIDDEN_DESCRIPTOR, Some(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message.into()))
    }

    pub fn internal(error: AnyError) -> Self {
        error!(?error, "internal server error");
        Self::from_descriptor(&INTERNAL_SERVER_ERROR_DESCRIPTOR, None).with_source(error)
    }

    pub fn from_anyhow(error: AnyError) -> Self {
        Self::internal(error)
    }

    pub fn from_provision(error: ProvisionError) -> Self {
        match error {
            ProvisionError::RoleNotFound(role) => Self::role_not_found(role),
            ProvisionError::Store(source) => Self::internal(source),
        }
    }

    pub fn user_not_found(user_id: &str) -> Self {
        let user_id = user_id.to_owned();
        let message = format!("User {user_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("USER_NOT_FOUND")
            .with_data(json!({ "userId": user_id }))
    }

    pub fn workspace_not_found(workspace_id: &str) -> Self {
        let workspace_id = workspace_id.to_owned();
        let message = format!("Workspace {workspace_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("WORKSPACE_NOT_FOUND")
            .with_data(json!({ "workspaceId": workspace_id }))
    }

    pub fn role_not_found(role: &str) -> Self {
        let role = role.to_owned();
        let message = format!("Role {role} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("ROLE_NOT_FOUND")
            .with_data(json!({ "role": role }))
    }

    pub fn member_not_found(workspace_id: &str, user_id: &str) -> Self {
        let workspace_id = workspace_id.to_owned();
        let user_id = user_id.to_owned();
        let message = format!("User {user_id} is not a member of workspace {workspace_id}.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("MEMBER_NOT_FOUND")
            .with_data(json!({ "workspaceId": workspace_id, "userId": user_id }))
    }

    pub fn email_taken() -> Self {
        Self::from_descriptor(&CONFLICT_DESCRIPTOR, Some("Email already exists.".into()))
            .with_name("EMAIL_ALREADY_EXISTS")
    }

    pub fn invalid_credentials() -> Self {
        Self::from_descriptor(
            &UNAUTHORIZED_DESCRIPTOR,
            Some("Invalid email or password.".into()),
        )
        .with_name("INVALID_CREDENTIALS")
    }

    pub fn status_code(&self) -> StatusCode {
        self.descriptor.status
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_payload(self) -> (StatusCode, ErrorPayload) {
        let AppError {
            descriptor,
            name,
            message,
            data,
            source: _,
        } = self;

        let status = descriptor.status;
        let reason = status
            .canonical_reason()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("Status {}", status.as_u16()));
        let payload = ErrorPayload {
            status: status.as_u16(),
            reason,
            name,
            message,
            data,
        };

        (status, payload)
    }

    fn from_descriptor(descriptor: &'static ErrorDescriptor, message: Option<String>) -> Self {
        Self {
            descriptor,
            name: descriptor.name.to_owned(),
            message: message.unwrap_or_else(|| descriptor.default_message.to_owned()),
            data: None,
            source: None,
        }
    }

    fn with_source(mut self, error: AnyError) -> Self {
        self.source = Some(error);
        self
    }

    fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = self.into_payload();
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ErrorPayload {
    pub(crate) status: u16,
    pub(crate) reason: String,
    pub(crate) name: String,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<JsonValue>,
}
