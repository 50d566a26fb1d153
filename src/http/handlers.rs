use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::app::auth::{LoginOutcome, Registration, TokenPair};
use crate::app::chat::AttachmentUpload;
use crate::app::router::{present_notification, resolve_click, Action, ClickTarget, Dispatched, Presentation};
use crate::app::shifts::NewShift;
use crate::domain::activity::{ActivityKind, UserActivity};
use crate::domain::chat::{Category, ChatDraft, ChatMessage};
use crate::domain::notification::Notification;
use crate::domain::request::{AdminRequest, Outcome, RequestKind, RequestStatus};
use crate::domain::session::SessionContext;
use crate::domain::shift::ShiftAssignment;
use crate::domain::user::{PublicUser, Role, User};
use crate::http::{AdminToken, AdminUser, AppError, CurrentUser, MaybeBearer};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_PASSWORD_LEN: usize = 128;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_DISPLAY_NAME_CHARS: usize = 80;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

/// A cursor is only handed out when the page came back full.
fn next_cursor<T>(
    items: &[T],
    limit: i64,
    key: impl Fn(&T) -> (OffsetDateTime, Uuid),
) -> Option<String> {
    if (items.len() as i64) < limit {
        return None;
    }
    encode_cursor(items.last().map(key))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

impl From<TokenPair> for AuthTokenResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.email.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let outcome = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match outcome {
        LoginOutcome::Success { user_id, tokens } => {
            state.user_service().touch_last_login(user_id).await;
            state
                .activity_log()
                .record(user_id, ActivityKind::Login, serde_json::json!({}))
                .await;
            Ok(Json(tokens.into()))
        }
        LoginOutcome::InvalidCredentials => Err(AppError::unauthorized("invalid credentials")),
        LoginOutcome::Inactive => Err(AppError::forbidden(
            "account is pending approval or has been disabled",
        )),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let tokens = state
        .auth_service()
        .refresh(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to refresh token");
            AppError::internal("failed to refresh token")
        })?;

    tokens
        .map(|tokens| Json(tokens.into()))
        .ok_or_else(|| AppError::unauthorized("invalid refresh token"))
}

pub async fn revoke_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let revoked = state
        .auth_service()
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to revoke token");
            AppError::internal("failed to revoke token")
        })?;

    if !revoked {
        tracing::debug!("revoke called with an unknown or already revoked token");
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn get_session(
    State(state): State<AppState>,
    MaybeBearer(token): MaybeBearer,
) -> Result<Json<SessionContext>, AppError> {
    let session = state
        .auth_service()
        .session(token.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to resolve session");
            AppError::internal("failed to resolve session")
        })?;

    tracing::debug!(
        user_id = ?session.profile().map(|user| user.id),
        "session resolved"
    );
    Ok(Json(session))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub department: Option<String>,
    #[serde(default = "default_requested_role")]
    pub requested_role: Role,
}

fn default_requested_role() -> Role {
    Role::Staff
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub user: User,
    pub admin_request: Option<AdminRequest>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), AppError> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    let display_name = payload.display_name.trim().to_string();
    if display_name.is_empty() || display_name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(AppError::bad_request(
            "display_name must be between 1 and 80 characters",
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LEN || payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "password must be between 8 and 128 characters",
        ));
    }
    let department = payload
        .department
        .map(|department| department.trim().to_string())
        .filter(|department| !department.is_empty());

    let registration = Registration {
        email,
        display_name,
        password: payload.password,
        department,
        requested_role: payload.requested_role,
    };
    let registered = state
        .auth_service()
        .signup(registration, &state.request_service())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: registered.user,
            admin_request: registered.admin_request,
        }),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = state
        .user_service()
        .get_user(user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user_id, "failed to load user");
            AppError::internal("failed to load user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let body = if viewer.id == user.id || viewer.is_admin() {
        serde_json::to_value(user)
    } else {
        serde_json::to_value(PublicUser::from(user))
    };
    body.map(Json).map_err(|err| {
        tracing::error!(error = ?err, "failed to serialize user");
        AppError::internal("failed to load user")
    })
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub department: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    if viewer.id != user_id {
        return Err(AppError::forbidden("cannot update another user"));
    }

    let display_name = payload.display_name.map(|name| name.trim().to_string());
    if let Some(name) = &display_name {
        if name.is_empty() || name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(AppError::bad_request(
                "display_name must be between 1 and 80 characters",
            ));
        }
    }
    let department = payload.department.map(|department| department.trim().to_string());

    let user = state
        .user_service()
        .update_profile(user_id, display_name, department)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user_id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state
        .user_service()
        .list_staff(query.include_inactive)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list users");
            AppError::internal("failed to list users")
        })?;

    Ok(Json(users))
}

pub async fn list_user_activities(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<UserActivity>>, AppError> {
    let activities = state
        .activity_log()
        .list_for_user(user_id, page_size(query.limit))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user_id, "failed to list activities");
            AppError::internal("failed to list activities")
        })?;

    Ok(Json(activities))
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub kind: RequestKind,
    pub reason: Option<String>,
}

pub async fn submit_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<AdminRequest>), AppError> {
    if payload.kind == RequestKind::AdminAccess && user.is_admin() {
        return Err(AppError::bad_request("account already has admin access"));
    }

    let request = state
        .request_service()
        .submit(&user, payload.kind, payload.reason)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_my_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<AdminRequest>>, AppError> {
    let requests = state.request_service().list_for_user(user.id).await?;
    Ok(Json(requests))
}

#[derive(Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_requests(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<ListResponse<AdminRequest>>, AppError> {
    let limit = page_size(query.limit);
    let cursor = parse_cursor(query.cursor)?;

    let items = state
        .request_service()
        .list(query.status, cursor, limit)
        .await?;
    let next_cursor = next_cursor(&items, limit, |request| (request.requested_at, request.id));

    Ok(Json(ListResponse { items, next_cursor }))
}

pub async fn approve_request(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(request_id): Path<Uuid>,
) -> Result<Json<AdminRequest>, AppError> {
    let request = state
        .request_service()
        .decide(request_id, Outcome::Approve, &admin)
        .await?;
    Ok(Json(request))
}

pub async fn reject_request(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(request_id): Path<Uuid>,
) -> Result<Json<AdminRequest>, AppError> {
    let request = state
        .request_service()
        .decide(request_id, Outcome::Reject, &admin)
        .await?;
    Ok(Json(request))
}

#[derive(Deserialize)]
pub struct AssignShiftRequest {
    pub user_id: Uuid,
    pub ward: String,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
}

pub async fn assign_shift(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<AssignShiftRequest>,
) -> Result<(StatusCode, Json<ShiftAssignment>), AppError> {
    let shift = state
        .shift_service()
        .assign(
            &admin,
            NewShift {
                user_id: payload.user_id,
                ward: payload.ward,
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(shift)))
}

pub async fn list_my_shifts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ShiftAssignment>>, AppError> {
    let shifts = state.shift_service().list_for_user(user.id).await?;
    Ok(Json(shifts))
}

pub async fn decline_shift(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(shift_id): Path<Uuid>,
) -> Result<Json<ShiftAssignment>, AppError> {
    let shift = state.shift_service().decline(shift_id, user.id).await?;
    Ok(Json(shift))
}

#[derive(Deserialize)]
pub struct ChatQuery {
    pub category: Option<Category>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ChatQuery>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let messages = state
        .chat_service()
        .recent(state.chat_window_size, query.category)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load messages");
            AppError::internal("failed to load messages")
        })?;

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(draft): Json<ChatDraft>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    let message = state.chat_service().send(&user, draft).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_message_read(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.chat_service().mark_read(message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.chat_service().delete(message_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sends the full message window once on connect and again after every
/// change. The feed receiver is dropped with the stream when the client
/// disconnects.
pub async fn chat_stream(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<ChatQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let service = state.chat_service();
    let receiver = service.feed().subscribe();
    let limit = state.chat_window_size;
    let category = query.category;

    let stream = stream::unfold(
        (service, receiver, true),
        move |(service, mut receiver, first)| async move {
            if !first {
                match receiver.recv().await {
                    // A lagged receiver missed ticks, but one re-read covers them.
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return None,
                }
            }

            let event = match service.recent(limit, category).await {
                Ok(messages) => Event::default()
                    .event("window")
                    .json_data(&messages)
                    .unwrap_or_else(|err| {
                        tracing::warn!(error = ?err, "failed to encode chat window");
                        Event::default().event("error").data("failed to load messages")
                    }),
                Err(err) => {
                    tracing::warn!(error = ?err, "failed to load chat window");
                    Event::default().event("error").data("failed to load messages")
                }
            };

            Some((Ok(event), (service, receiver, false)))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
pub struct AttachmentUploadRequest {
    pub content_type: String,
    pub bytes: i64,
}

pub async fn create_attachment_upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<AttachmentUploadRequest>,
) -> Result<(StatusCode, Json<AttachmentUpload>), AppError> {
    let upload = state
        .chat_service()
        .create_attachment_upload(
            user.id,
            &payload.content_type,
            payload.bytes,
            state.upload_max_bytes,
            state.upload_url_ttl_seconds,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(upload)))
}

#[derive(Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub presentation: Presentation,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        let presentation = present_notification(&notification);
        Self {
            notification,
            presentation,
        }
    }
}

pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ListResponse<NotificationView>>, AppError> {
    let limit = page_size(query.limit);
    let cursor = parse_cursor(query.cursor)?;

    let notifications = state
        .notification_service()
        .list(user.id, cursor, query.unread_only, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user.id, "failed to list notifications");
            AppError::internal("failed to list notifications")
        })?;
    let next_cursor = next_cursor(&notifications, limit, |notification| {
        (notification.created_at, notification.id)
    });

    Ok(Json(ListResponse {
        items: notifications.into_iter().map(NotificationView::from).collect(),
        next_cursor,
    }))
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

pub async fn unread_notification_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let unread = state
        .notification_service()
        .unread_count(user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user.id, "failed to count notifications");
            AppError::internal("failed to count notifications")
        })?;

    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let updated = state
        .notification_service()
        .mark_read(notification_id, user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, notification_id = %notification_id, "failed to mark notification read");
            AppError::internal("failed to mark notification read")
        })?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("notification not found"))
    }
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let updated = state
        .notification_service()
        .mark_all_read(user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user.id, "failed to mark notifications read");
            AppError::internal("failed to mark notifications read")
        })?;

    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn dispatch_notification_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((notification_id, action)): Path<(Uuid, Action)>,
) -> Result<Json<Dispatched>, AppError> {
    let dispatched = state
        .notification_router()
        .dispatch(notification_id, action, &user)
        .await?;
    Ok(Json(dispatched))
}

#[derive(Deserialize)]
pub struct ClickRequest {
    #[serde(default)]
    pub open_windows: Vec<String>,
}

pub async fn resolve_notification_click(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
    Json(payload): Json<ClickRequest>,
) -> Result<Json<ClickTarget>, AppError> {
    let notifications = state.notification_service();
    let notification = notifications
        .get(notification_id, user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, notification_id = %notification_id, "failed to load notification");
            AppError::internal("failed to load notification")
        })?
        .ok_or_else(|| AppError::not_found("notification not found"))?;

    let presentation = present_notification(&notification);
    let target = resolve_click(
        &payload.open_windows,
        &state.app_origin,
        presentation.destination,
    );

    if let Err(err) = notifications.mark_read(notification.id, user.id).await {
        tracing::warn!(error = ?err, notification_id = %notification.id, "failed to mark clicked notification read");
    }

    Ok(Json(target))
}

pub async fn promote_user(
    State(state): State<AppState>,
    _admin: AdminToken,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state
        .user_service()
        .promote_to_admin(user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user_id, "failed to promote user");
            AppError::internal("failed to promote user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    tracing::info!(user_id = %user.id, "user promoted to admin");
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_through_encoding() {
        let timestamp = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let id = Uuid::new_v4();

        let encoded = encode_cursor(Some((timestamp, id))).unwrap();
        let decoded = parse_cursor(Some(encoded)).unwrap();
        assert_eq!(decoded, Some((timestamp, id)));
    }

    #[test]
    fn rejects_malformed_cursors() {
        assert!(parse_cursor(Some("nope".to_string())).is_err());
        assert!(parse_cursor(Some("2024-01-01T00:00:00Z/not-a-uuid".to_string())).is_err());
        assert!(parse_cursor(None).unwrap().is_none());
    }

    #[test]
    fn only_full_pages_get_a_next_cursor() {
        let timestamp = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let items = vec![(timestamp, Uuid::new_v4()), (timestamp, Uuid::new_v4())];

        assert!(next_cursor(&items, 3, |item| *item).is_none());
        assert!(next_cursor(&items, 2, |item| *item).is_some());
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(1_000)), MAX_PAGE_SIZE);
    }
}
