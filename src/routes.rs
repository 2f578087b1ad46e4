// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, result},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every route requires a bearer token.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (engine and config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new().route(
        "/{quiz_id}/attempts",
        get(attempt::list_attempts).post(attempt::start_attempt),
    );

    let attempt_routes = Router::new()
        .route("/{attempt_id}/finish", post(attempt::finish_attempt))
        .route("/{attempt_id}/abandon", post(attempt::abandon_attempt))
        .route("/{attempt_id}/result", get(result::get_result))
        .route("/{attempt_id}/recommendations", get(result::get_recommendations));

    let api = Router::new()
        .nest("/quizzes", quiz_routes)
        .nest("/attempts", attempt_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api)
        // Global Middleware (outermost last)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
