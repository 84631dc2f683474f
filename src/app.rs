use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{resource, system};
use crate::middleware::require_principal;
use crate::services::{AttrResource, RecipeResource};

/// Shared state for the public routes and the auth middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Full application router with the global config applied
pub fn app(store: Store) -> Router {
    router(store, crate::config::config())
}

pub fn router(store: Store, config: &AppConfig) -> Router {
    let state = AppState::new(store);

    let router = Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .with_state(state.clone())
        // Protected
        .merge(protected_routes(state))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    let router = match cors_layer(config) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn protected_routes(state: AppState) -> Router {
    let store = &state.store;

    Router::new()
        .route("/me", get(system::whoami))
        .merge(resource::routes("/tags", Arc::new(AttrResource::new(store.tags.clone()))))
        .merge(resource::routes(
            "/ingredients",
            Arc::new(AttrResource::new(store.ingredients.clone())),
        ))
        .merge(resource::routes("/recipes", Arc::new(RecipeResource::new(store.recipes.clone()))))
        // route_layer so unmatched paths still 404 instead of 401
        .route_layer(from_fn_with_state(state, require_principal))
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
