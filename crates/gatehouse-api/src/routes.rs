//! API route definitions

use crate::auth::middleware::{access_token_middleware, refresh_token_middleware, require_roles};
use crate::handlers::{auth, health, tenants, users};
use crate::middleware::metrics_middleware;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use gatehouse_core::Role;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// OpenAPI document for every mounted endpoint
#[derive(OpenApi)]
#[openapi(
    info(title = "Gatehouse API", description = "Authentication and multi-tenant access control"),
    paths(
        crate::handlers::auth::register_handler,
        crate::handlers::auth::login_handler,
        crate::handlers::auth::self_handler,
        crate::handlers::auth::refresh_handler,
        crate::handlers::auth::logout_handler,
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::list_tenants,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::update_tenant,
        crate::handlers::tenants::delete_tenant,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::health::health_check,
        crate::handlers::health::prometheus_metrics,
    ),
    components(schemas(
        crate::auth::RegisterRequest,
        crate::auth::LoginRequest,
        crate::handlers::IdResponse,
        crate::handlers::tenants::CreateTenantRequest,
        crate::handlers::tenants::UpdateTenantRequest,
        crate::handlers::users::CreateUserRequest,
        crate::handlers::users::UpdateUserRequest,
        crate::handlers::health::HealthResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
        gatehouse_core::Role,
        gatehouse_core::Tenant,
        gatehouse_core::UserPublic,
        gatehouse_core::UserPage,
    )),
    tags(
        (name = "auth", description = "Registration, login and token lifecycle"),
        (name = "tenants", description = "Tenant management"),
        (name = "users", description = "User administration"),
        (name = "health", description = "Liveness and metrics"),
    )
)]
pub struct ApiDoc;

/// Authentication routes
///
/// `/auth/refresh` is the only route guarded by the refresh-token variant.
fn auth_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler));

    let refresh = Router::new()
        .route("/auth/refresh", post(auth::refresh_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            refresh_token_middleware,
        ));

    let protected = Router::new()
        .route("/auth/self", get(auth::self_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access_token_middleware,
        ));

    public.merge(refresh).merge(protected)
}

/// Tenant routes: open reads, admin-only writes
fn tenant_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let open = Router::new()
        .route("/tenants", get(tenants::list_tenants))
        .route("/tenants/:id", get(tenants::get_tenant));

    let admin = Router::new()
        .route("/tenants", post(tenants::create_tenant))
        .route(
            "/tenants/:id",
            axum::routing::patch(tenants::update_tenant).delete(tenants::delete_tenant),
        )
        .route_layer(middleware::from_fn(require_roles(ADMIN_ONLY)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access_token_middleware,
        ));

    open.merge(admin)
}

/// User administration routes, all admin-only
fn user_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn(require_roles(ADMIN_ONLY)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access_token_middleware,
        ))
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::prometheus_metrics))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(auth_routes(&state))
        .merge(tenant_routes(&state))
        .merge(user_routes(&state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_auth_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/auth/register", "/auth/login", "/auth/refresh", "/tenants/{id}", "/users"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
