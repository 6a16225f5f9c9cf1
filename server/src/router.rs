// Router configuration

use axum::{
    Router,
    http::Method,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth_handlers::*, health_handlers::*, workspace_handlers::*},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health))
        // Authentication
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/user/current", get(current_user))
        // Workspaces
        .route("/api/workspace/create/new", post(create_workspace))
        .route("/api/workspace/all", get(list_workspaces))
        .route("/api/workspace/update/{id}", put(update_workspace))
        .route("/api/workspace/delete/{id}", delete(delete_workspace))
        .route("/api/workspace/members/{id}", get(get_members))
        .route("/api/workspace/analytics/{id}", get(get_analytics))
        .route(
            "/api/workspace/change/member/role/{id}",
            put(change_member_role),
        )
        .route("/api/workspace/{id}", get(get_workspace))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
