// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{delete, get, patch, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, health, portfolio},
    state::AppState,
    utils::{
        api_key::API_KEY_HEADER,
        auth::{bearer_auth, dual_auth, require_admin},
    },
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, portfolio, health).
/// * Applies global middleware (Trace, CORS, optional rate limit).
/// * Injects global state (stores and config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .allow_credentials(true);

    let bearer = middleware::from_fn_with_state(state.clone(), bearer_auth);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected account routes
        .merge(
            Router::new()
                .route(
                    "/profile",
                    get(auth::get_profile).put(auth::update_profile),
                )
                .route("/generate-api-key", post(auth::generate_key))
                .route("/revoke-api-key", delete(auth::revoke_key))
                .layer(bearer.clone()),
        );

    let owner_routes = Router::new()
        .route(
            "/",
            get(portfolio::list_portfolios).post(portfolio::create_portfolio),
        )
        .route(
            "/{id}",
            get(portfolio::get_portfolio)
                .put(portfolio::update_portfolio)
                .delete(portfolio::delete_portfolio),
        )
        .layer(bearer.clone());

    let public_routes = Router::new()
        .route("/public/all", get(portfolio::list_public))
        .layer(middleware::from_fn_with_state(state.clone(), dual_auth));

    let admin_routes = Router::new()
        .route("/{id}/featured", patch(portfolio::set_featured))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(require_admin))
        .layer(bearer);

    let portfolio_routes = owner_routes.merge(public_routes).merge(admin_routes);

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/portfolio", portfolio_routes)
        .fallback(health::not_found);

    // Per-IP quota; needs the server to provide peer addresses
    // (`into_make_service_with_connect_info`).
    let router = match state.config.rate_limit {
        Some(limit) => match GovernorConfigBuilder::default()
            .per_second(limit.per_second)
            .burst_size(limit.burst_size)
            .finish()
        {
            Some(governor_conf) => router.layer(GovernorLayer::new(Arc::new(governor_conf))),
            None => {
                tracing::warn!("Invalid rate limit settings, rate limiting disabled");
                router
            }
        },
        None => router,
    };

    router
        // Global Middleware (CORS outermost)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
