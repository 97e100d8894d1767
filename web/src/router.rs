use crate::{controller::health_check_controller, middleware::session::require_session, AppState};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use log::warn;
use tower_http::cors::CorsLayer;

use crate::controller::auth_controller;

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Common Stories API"
        ),
        paths(
            auth_controller::oauth_callback,
            auth_controller::me,
            auth_controller::logout,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                auth_controller::OAuthCallbackParams,
                domain::user_profile::UserProfile,
                domain::user_profile::RoleSummary,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "common_stories", description = "Common Stories publishing platform API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our cookie session based authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "session_id",
                    "Opaque session id set by a successful OAuth login via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.allowed_origins);

    Router::new()
        .merge(health_routes())
        .merge(auth_public_routes(app_state.clone()))
        .merge(auth_protected_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(cors)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn auth_public_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/auth/oauth/callback",
            post(auth_controller::oauth_callback),
        )
        .with_state(app_state)
}

fn auth_protected_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/me", get(auth_controller::me))
        .route("/auth/logout", post(auth_controller::logout))
        .route_layer(from_fn_with_state(app_state.clone(), require_session))
        .with_state(app_state)
}

/// CORS from the configured origin allow-list. Credentialed requests are
/// allowed; each response echoes one allow-listed origin or none, never a
/// wildcard.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparseable CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}
