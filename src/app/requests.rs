use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::activity::ActivityLog;
use crate::app::error::{ServiceError, ServiceResult};
use crate::app::inflight::InFlight;
use crate::app::notifications::{admin_recipients, NotificationService};
use crate::domain::activity::ActivityKind;
use crate::domain::notification::{Notification, NotificationEvent, NotificationKind, Priority};
use crate::domain::request::{AdminRequest, Outcome, RequestKind, RequestStatus};
use crate::domain::user::User;
use crate::infra::db::Db;

const REQUEST_COLUMNS: &str =
    "id, user_id, name, email, kind, status, reason, requested_at, decided_by, decided_at";

pub const MAX_REASON_CHARS: usize = 500;

#[derive(Clone)]
pub struct RequestService {
    db: Db,
    notifications: NotificationService,
    activity: ActivityLog,
    inflight: InFlight,
}

impl RequestService {
    pub fn new(
        db: Db,
        notifications: NotificationService,
        activity: ActivityLog,
        inflight: InFlight,
    ) -> Self {
        Self {
            db,
            notifications,
            activity,
            inflight,
        }
    }

    pub async fn submit(
        &self,
        requester: &User,
        kind: RequestKind,
        reason: Option<String>,
    ) -> ServiceResult<AdminRequest> {
        let reason = normalize_reason(reason)?;

        let mut tx = self.db.begin().await?;
        let (request, notifications) = self
            .submit_with_tx(requester, kind, reason, &mut tx)
            .await?;
        tx.commit().await?;

        self.notifications.publish(&notifications).await;
        self.activity
            .record(
                requester.id,
                ActivityKind::RequestSubmitted,
                json!({ "request_id": request.id, "kind": kind.as_db() }),
            )
            .await;

        Ok(request)
    }

    /// Inserts a pending request and one notification per other active admin.
    /// The caller commits and publishes the returned notifications.
    pub async fn submit_with_tx(
        &self,
        requester: &User,
        kind: RequestKind,
        reason: Option<String>,
        tx: &mut Transaction<'_, Postgres>,
    ) -> ServiceResult<(AdminRequest, Vec<Notification>)> {
        if kind == RequestKind::AdminAccess {
            let pending: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM admin_requests \
                 WHERE user_id = $1 AND kind = 'admin_access' AND status = 'pending')",
            )
            .bind(requester.id)
            .fetch_one(&mut **tx)
            .await?;
            if pending {
                return Err(ServiceError::AlreadyExists);
            }
        }

        let row = sqlx::query(&format!(
            "INSERT INTO admin_requests (user_id, name, email, kind, reason) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(requester.id)
        .bind(&requester.display_name)
        .bind(&requester.email)
        .bind(kind.as_db())
        .bind(&reason)
        .fetch_one(&mut **tx)
        .await?;
        let request = request_from_row(&row);

        let (notification_kind, title) = match kind {
            RequestKind::AdminAccess => (NotificationKind::AdminRequest, "New admin access request"),
            RequestKind::Leave => (NotificationKind::LeaveRequest, "New leave request"),
        };
        let body = match &request.reason {
            Some(reason) => format!("{}: {}", request.name, reason),
            None => format!("{} submitted a request", request.name),
        };

        let mut notifications = Vec::new();
        for admin_id in admin_recipients(requester.id, tx).await? {
            let event = NotificationEvent {
                user_id: admin_id,
                kind: notification_kind,
                title: title.to_string(),
                body: body.clone(),
                payload: json!({ "request_id": request.id, "requester_id": requester.id }),
                priority: Priority::Normal,
            };
            notifications.push(self.notifications.emit_with_tx(&event, tx).await?);
        }

        Ok((request, notifications))
    }

    /// Moves a pending request to its terminal state. The status check, the
    /// requester's account change and the outcome notification commit as
    /// one transaction.
    pub async fn decide(
        &self,
        request_id: Uuid,
        outcome: Outcome,
        actor: &User,
    ) -> ServiceResult<AdminRequest> {
        if !actor.is_admin() {
            return Err(ServiceError::PermissionDenied);
        }
        // Held by another decision on this instance. Retryable.
        let _guard = self
            .inflight
            .try_acquire(request_id)
            .ok_or(ServiceError::Unavailable)?;

        let mut tx = self.db.begin().await?;

        // Deciders on any instance serialize on this row lock; the later one
        // reads the committed status.
        let locked =
            sqlx::query("SELECT user_id, status FROM admin_requests WHERE id = $1 FOR UPDATE")
                .bind(request_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(locked) = locked else {
            return Err(ServiceError::NotFound);
        };
        let requester_id: Uuid = locked.get("user_id");
        if requester_id == actor.id {
            return Err(ServiceError::PermissionDenied);
        }
        let status: String = locked.get("status");
        let next = RequestStatus::from_db(&status)
            .and_then(|current| current.after(outcome))
            .ok_or(ServiceError::AlreadyProcessed)?;

        let row = sqlx::query(&format!(
            "UPDATE admin_requests \
             SET status = $2, decided_by = $3, decided_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(next.as_db())
        .bind(actor.id)
        .fetch_optional(&mut *tx)
        .await?;

        let request = match row {
            Some(row) => request_from_row(&row),
            None => return Err(ServiceError::AlreadyProcessed),
        };

        if request.kind == RequestKind::AdminAccess {
            let (role, is_active) = match outcome {
                Outcome::Approve => ("admin", true),
                Outcome::Reject => ("staff", false),
            };
            let updated = sqlx::query("UPDATE users SET role = $2, is_active = $3 WHERE id = $1")
                .bind(request.user_id)
                .bind(role)
                .bind(is_active)
                .execute(&mut *tx)
                .await?;
            if updated.rows_affected() == 0 {
                return Err(ServiceError::NotFound);
            }
        }

        let event = outcome_event(&request, outcome);
        let notification = self.notifications.emit_with_tx(&event, &mut tx).await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            actor_id = %actor.id,
            status = request.status.as_db(),
            "request decided"
        );

        self.notifications.publish(&[notification]).await;
        self.activity
            .record(
                actor.id,
                ActivityKind::RequestDecided,
                json!({ "request_id": request.id, "status": request.status.as_db() }),
            )
            .await;

        Ok(request)
    }

    pub async fn publish(&self, notifications: &[Notification]) {
        self.notifications.publish(notifications).await;
    }

    pub async fn get(&self, request_id: Uuid) -> ServiceResult<Option<AdminRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM admin_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(request_from_row))
    }

    pub async fn list(
        &self,
        status: Option<RequestStatus>,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ServiceResult<Vec<AdminRequest>> {
        let status = status.map(|status| status.as_db());
        let rows = match cursor {
            Some((requested_at, request_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM admin_requests \
                     WHERE ($1::text IS NULL OR status = $1) \
                       AND (requested_at < $2 OR (requested_at = $2 AND id < $3)) \
                     ORDER BY requested_at DESC, id DESC \
                     LIMIT $4",
                    REQUEST_COLUMNS
                ))
                .bind(status)
                .bind(requested_at)
                .bind(request_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM admin_requests \
                     WHERE ($1::text IS NULL OR status = $1) \
                     ORDER BY requested_at DESC, id DESC \
                     LIMIT $2",
                    REQUEST_COLUMNS
                ))
                .bind(status)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(request_from_row).collect())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<AdminRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM admin_requests WHERE user_id = $1 \
             ORDER BY requested_at DESC, id DESC",
            REQUEST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(request_from_row).collect())
    }
}

fn normalize_reason(reason: Option<String>) -> ServiceResult<Option<String>> {
    let reason = reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());
    if let Some(ref reason) = reason {
        if reason.chars().count() > MAX_REASON_CHARS {
            return Err(ServiceError::invalid("reason must be at most 500 characters"));
        }
    }
    Ok(reason)
}

/// The single notification a decision sends to the requester.
fn outcome_event(request: &AdminRequest, outcome: Outcome) -> NotificationEvent {
    let (kind, title, body) = match (request.kind, outcome) {
        (RequestKind::Leave, Outcome::Approve) => (
            NotificationKind::LeaveApproved,
            "Leave approved",
            "Your leave request has been approved.",
        ),
        (RequestKind::Leave, Outcome::Reject) => (
            NotificationKind::LeaveRejected,
            "Leave rejected",
            "Your leave request has been rejected.",
        ),
        (RequestKind::AdminAccess, Outcome::Approve) => (
            NotificationKind::AdminRequestApproved,
            "Admin access approved",
            "Your admin access request has been approved.",
        ),
        (RequestKind::AdminAccess, Outcome::Reject) => (
            NotificationKind::AdminRequestRejected,
            "Admin access rejected",
            "Your admin access request has been rejected.",
        ),
    };

    NotificationEvent {
        user_id: request.user_id,
        kind,
        title: title.to_string(),
        body: body.to_string(),
        payload: json!({ "request_id": request.id, "status": request.status.as_db() }),
        priority: Priority::Normal,
    }
}

fn request_from_row(row: &PgRow) -> AdminRequest {
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    AdminRequest {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        email: row.get("email"),
        // Both columns carry CHECK constraints.
        kind: RequestKind::from_db(&kind).unwrap_or(RequestKind::Leave),
        status: RequestStatus::from_db(&status).unwrap_or(RequestStatus::Pending),
        reason: row.get("reason"),
        requested_at: row.get("requested_at"),
        decided_by: row.get("decided_by"),
        decided_at: row.get("decided_at"),
    }
}
