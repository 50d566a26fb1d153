use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/auth/me", get(handlers::get_current_user))
        .route("/auth/session", get(handlers::get_session))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id", patch(handlers::update_profile))
        .route("/admin/users", get(handlers::list_users))
        .route(
            "/admin/users/:id/activities",
            get(handlers::list_user_activities),
        )
}

pub fn requests() -> Router<AppState> {
    Router::new()
        .route("/requests", post(handlers::submit_request))
        .route("/requests", get(handlers::list_my_requests))
        .route("/admin/requests", get(handlers::list_requests))
        .route(
            "/admin/requests/:id/approve",
            post(handlers::approve_request),
        )
        .route("/admin/requests/:id/reject", post(handlers::reject_request))
}

pub fn shifts() -> Router<AppState> {
    Router::new()
        .route("/shifts", post(handlers::assign_shift))
        .route("/shifts", get(handlers::list_my_shifts))
        .route("/shifts/:id/decline", post(handlers::decline_shift))
}

pub fn chat() -> Router<AppState> {
    Router::new()
        .route("/chat/messages", get(handlers::list_messages))
        .route("/chat/messages", post(handlers::send_message))
        .route("/chat/messages/:id", delete(handlers::delete_message))
        .route("/chat/messages/:id/read", post(handlers::mark_message_read))
        .route("/chat/stream", get(handlers::chat_stream))
        .route("/chat/attachments", post(handlers::create_attachment_upload))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/unread-count",
            get(handlers::unread_notification_count),
        )
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
        .route(
            "/notifications/:id/click",
            post(handlers::resolve_notification_click),
        )
        .route(
            "/notifications/:id/actions/:action",
            post(handlers::dispatch_notification_action),
        )
}

pub fn ops() -> Router<AppState> {
    Router::new().route("/ops/users/:id/promote", post(handlers::promote_user))
}
