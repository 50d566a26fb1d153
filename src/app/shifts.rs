use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app::activity::ActivityLog;
use crate::app::error::{ServiceError, ServiceResult};
use crate::app::notifications::NotificationService;
use crate::domain::activity::ActivityKind;
use crate::domain::notification::{NotificationEvent, NotificationKind, Priority};
use crate::domain::shift::{ShiftAssignment, ShiftStatus};
use crate::domain::user::User;
use crate::infra::db::Db;

const SHIFT_COLUMNS: &str =
    "id, user_id, assigned_by, ward, starts_at, ends_at, status, declined_at, created_at";

const MAX_SHIFT_HOURS: i64 = 24;

#[derive(Clone)]
pub struct ShiftService {
    db: Db,
    notifications: NotificationService,
    activity: ActivityLog,
}

pub struct NewShift {
    pub user_id: Uuid,
    pub ward: String,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
}

impl NewShift {
    pub fn validate(mut self) -> ServiceResult<Self> {
        self.ward = self.ward.trim().to_string();
        if self.ward.is_empty() {
            return Err(ServiceError::invalid("ward is required"));
        }
        if self.ends_at <= self.starts_at {
            return Err(ServiceError::invalid("shift must end after it starts"));
        }
        if self.ends_at - self.starts_at > Duration::hours(MAX_SHIFT_HOURS) {
            return Err(ServiceError::invalid("shift must be at most 24 hours"));
        }
        Ok(self)
    }
}

impl ShiftService {
    pub fn new(db: Db, notifications: NotificationService, activity: ActivityLog) -> Self {
        Self {
            db,
            notifications,
            activity,
        }
    }

    pub async fn assign(&self, actor: &User, shift: NewShift) -> ServiceResult<ShiftAssignment> {
        if !actor.is_admin() {
            return Err(ServiceError::PermissionDenied);
        }
        let shift = shift.validate()?;

        let mut tx = self.db.begin().await?;

        let assignee_active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
                .bind(shift.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        match assignee_active {
            None => return Err(ServiceError::NotFound),
            Some(false) => return Err(ServiceError::invalid("cannot assign shifts to an inactive account")),
            Some(true) => {}
        }

        let row = sqlx::query(&format!(
            "INSERT INTO shift_assignments (user_id, assigned_by, ward, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            SHIFT_COLUMNS
        ))
        .bind(shift.user_id)
        .bind(actor.id)
        .bind(&shift.ward)
        .bind(shift.starts_at)
        .bind(shift.ends_at)
        .fetch_one(&mut *tx)
        .await?;
        let assignment = shift_from_row(&row);

        let starts = assignment
            .starts_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| assignment.starts_at.to_string());
        let event = NotificationEvent {
            user_id: assignment.user_id,
            kind: NotificationKind::ShiftAssigned,
            title: "New shift assigned".to_string(),
            body: format!("{} starting {}", assignment.ward, starts),
            payload: json!({ "shift_id": assignment.id, "ward": assignment.ward, "starts_at": starts }),
            priority: Priority::High,
        };
        let notification = self.notifications.emit_with_tx(&event, &mut tx).await?;

        tx.commit().await?;

        self.notifications.publish(&[notification]).await;
        Ok(assignment)
    }

    /// Only the assignee may decline, and only once.
    pub async fn decline(&self, shift_id: Uuid, actor_id: Uuid) -> ServiceResult<ShiftAssignment> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE shift_assignments \
             SET status = 'declined', declined_at = now() \
             WHERE id = $1 AND user_id = $2 AND status = 'assigned' \
             RETURNING {}",
            SHIFT_COLUMNS
        ))
        .bind(shift_id)
        .bind(actor_id)
        .fetch_optional(&mut *tx)
        .await?;

        let assignment = match row {
            Some(row) => shift_from_row(&row),
            None => {
                let owner: Option<Uuid> =
                    sqlx::query_scalar("SELECT user_id FROM shift_assignments WHERE id = $1")
                        .bind(shift_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match owner {
                    None => ServiceError::NotFound,
                    Some(owner) if owner != actor_id => ServiceError::PermissionDenied,
                    Some(_) => ServiceError::AlreadyProcessed,
                });
            }
        };

        let event = NotificationEvent {
            user_id: assignment.assigned_by,
            kind: NotificationKind::ScheduleChange,
            title: "Shift declined".to_string(),
            body: format!("A shift on {} was declined", assignment.ward),
            payload: json!({ "shift_id": assignment.id, "declined_by": actor_id }),
            priority: Priority::Normal,
        };
        let notification = self.notifications.emit_with_tx(&event, &mut tx).await?;

        tx.commit().await?;

        self.notifications.publish(&[notification]).await;
        self.activity
            .record(
                actor_id,
                ActivityKind::ShiftDeclined,
                json!({ "shift_id": assignment.id }),
            )
            .await;

        Ok(assignment)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<ShiftAssignment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM shift_assignments WHERE user_id = $1 ORDER BY starts_at ASC, id ASC",
            SHIFT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(shift_from_row).collect())
    }
}

fn shift_from_row(row: &PgRow) -> ShiftAssignment {
    let status: String = row.get("status");
    ShiftAssignment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        assigned_by: row.get("assigned_by"),
        ward: row.get("ward"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        status: ShiftStatus::from_db(&status).unwrap_or(ShiftStatus::Assigned),
        declined_at: row.get("declined_at"),
        created_at: row.get("created_at"),
    }
}
