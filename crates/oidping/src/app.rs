use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use oidping_auth::auth_routes;
use oidping_core::auth::LOGIN_PATH;
use tower_http::{
    catch_panic::CatchPanicLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::{
    handlers::{
        health::{livez, readyz},
        pages::{error_page, home, login, manage, ERROR_PATH, MANAGE_PATH},
    },
    middleware::{enforce_antiforgery, enforce_https, error_boundary, panic_response},
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    compose(state, page_routes())
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route(LOGIN_PATH, get(login))
        .route(MANAGE_PATH, get(manage))
        .route(ERROR_PATH, get(error_page))
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
}

/// Stages, outermost first: error boundary, HTTPS enforcement, static
/// assets, anti-forgery, pages, identity endpoints.
///
/// The boundary sits outside the panic catcher so caught panics are rendered
/// like any other server error. Static assets never see the anti-forgery
/// stage.
fn compose(state: AppState, pages: Router<AppState>) -> Router {
    let endpoints = pages
        .with_state(state.clone())
        .merge(auth_routes().with_state(state.auth.clone()))
        .layer(from_fn_with_state(state.clone(), enforce_antiforgery));

    Router::new()
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .merge(endpoints)
        .layer(from_fn_with_state(state.clone(), enforce_https))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(state, error_boundary))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
}
