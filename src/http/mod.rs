use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod middleware;
mod routes;

pub use auth::{AdminToken, AdminUser, AuthUser, CurrentUser, MaybeBearer};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth())
        .merge(routes::users())
        .merge(routes::requests())
        .merge(routes::shifts())
        .merge(routes::chat())
        .merge(routes::notifications())
        .merge(routes::ops());

    Router::new()
        .merge(routes::health())
        .nest("/v1", api)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::ip_rate_limit_middleware,
        ))
        .layer(cors(&state))
        .with_state(state)
}

/// Browser access is limited to the dashboard origin.
fn cors(state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(&state.app_origin.origin().ascii_serialization()) {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            tracing::warn!(error = ?err, "APP_ORIGIN is not a valid header value, CORS disabled");
            layer
        }
    }
}
