use anyhow::Result;
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::activity::{ActivityKind, UserActivity};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ActivityLog {
    db: Db,
}

impl ActivityLog {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Failures are logged and dropped.
    pub async fn record(&self, user_id: Uuid, kind: ActivityKind, detail: Value) {
        let result = sqlx::query(
            "INSERT INTO user_activities (user_id, activity, detail) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(kind.as_db())
        .bind(detail)
        .execute(self.db.pool())
        .await;

        if let Err(err) = result {
            tracing::warn!(error = ?err, user_id = %user_id, activity = kind.as_db(), "failed to record activity");
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<UserActivity>> {
        let rows = sqlx::query(
            "SELECT id, user_id, activity, detail, created_at \
             FROM user_activities \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut activities = Vec::with_capacity(rows.len());
        for row in rows {
            activities.push(UserActivity {
                id: row.get("id"),
                user_id: row.get("user_id"),
                activity: row.get("activity"),
                detail: row.get("detail"),
                created_at: row.get("created_at"),
            });
        }

        Ok(activities)
    }
}
