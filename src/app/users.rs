use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::{Role, User};
use crate::infra::db::Db;

pub(crate) const USER_COLUMNS: &str =
    "id, email, display_name, role, department, is_active, last_login_at, created_at";

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        department: Option<String>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users \
             SET display_name = COALESCE($2, display_name), \
                 department = COALESCE($3, department) \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(display_name)
        .bind(department)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn list_staff(&self, include_inactive: bool) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users \
             WHERE ($1 = true OR is_active = true) \
             ORDER BY display_name ASC, id ASC",
            USER_COLUMNS
        ))
        .bind(include_inactive)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Bootstraps an admin outside the request workflow.
    pub async fn promote_to_admin(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users SET role = 'admin', is_active = true WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Best-effort: a failed timestamp write never blocks sign-in.
    pub async fn touch_last_login(&self, user_id: Uuid) {
        if let Err(err) = sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await
        {
            tracing::warn!(error = ?err, user_id = %user_id, "failed to update last login");
        }
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        // The column is constrained to known roles.
        role: Role::from_db(&role).unwrap_or(Role::Staff),
        department: row.get("department"),
        is_active: row.get("is_active"),
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
    }
}
