use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::{Notification, NotificationEvent, Priority, PushMessage};
use crate::infra::db::Db;
use crate::infra::queue::QueueClient;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, title, body, payload, priority, read_at, delivered_at, created_at";

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
    queue: QueueClient,
}

impl NotificationService {
    pub fn new(db: Db, queue: QueueClient) -> Self {
        Self { db, queue }
    }

    /// Writes one notification inside the caller's transaction so it commits
    /// or rolls back with the change that caused it.
    pub async fn emit_with_tx(
        &self,
        event: &NotificationEvent,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Notification, sqlx::Error> {
        let row = sqlx::query(&format!(
            "INSERT INTO notifications (user_id, notification_type, title, body, payload, priority) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(event.user_id)
        .bind(event.kind.as_str())
        .bind(&event.title)
        .bind(&event.body)
        .bind(&event.payload)
        .bind(event.priority.as_db())
        .fetch_one(&mut **tx)
        .await?;

        Ok(notification_from_row(&row))
    }

    /// Hands committed notifications to the push queue. Delivery is
    /// best-effort: the stored row is the source of truth.
    pub async fn publish(&self, notifications: &[Notification]) {
        for notification in notifications {
            let message = PushMessage::from(notification);
            if let Err(err) = self.queue.enqueue_push(&message).await {
                tracing::warn!(
                    error = ?err,
                    notification_id = %notification.id,
                    "failed to enqueue push delivery"
                );
            }
        }
    }

    pub async fn get(&self, notification_id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE id = $1 AND user_id = $2",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(notification_from_row))
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let rows = match cursor {
            Some((created_at, notification_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM notifications \
                     WHERE user_id = $1 \
                       AND ($2 = false OR read_at IS NULL) \
                       AND (created_at < $3 OR (created_at = $3 AND id < $4)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $5",
                    NOTIFICATION_COLUMNS
                ))
                .bind(user_id)
                .bind(unread_only)
                .bind(created_at)
                .bind(notification_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM notifications \
                     WHERE user_id = $1 \
                       AND ($2 = false OR read_at IS NULL) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3",
                    NOTIFICATION_COLUMNS
                ))
                .bind(user_id)
                .bind(unread_only)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(notification_from_row).collect())
    }

    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET read_at = now() \
             WHERE id = $1 AND user_id = $2 AND read_at IS NULL",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = now() WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Returns false when the notification was already delivered, so a
    /// redelivered queue message is not presented twice.
    pub async fn mark_delivered(&self, notification_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET delivered_at = now() \
             WHERE id = $1 AND delivered_at IS NULL",
        )
        .bind(notification_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(count)
    }
}

/// Active admins receive workflow notifications.
/// Active admins other than `requester_id`.
pub async fn admin_recipients(
    requester_id: Uuid,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM users WHERE role = 'admin' AND is_active = true AND id <> $1",
    )
    .bind(requester_id)
    .fetch_all(&mut **tx)
    .await
}

fn notification_from_row(row: &PgRow) -> Notification {
    let priority: String = row.get("priority");
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        notification_type: row.get("notification_type"),
        title: row.get("title"),
        body: row.get("body"),
        payload: row.get("payload"),
        priority: Priority::parse(&priority),
        read_at: row.get("read_at"),
        delivered_at: row.get("delivered_at"),
        created_at: row.get("created_at"),
    }
}
