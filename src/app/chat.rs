use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::Row;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::app::activity::ActivityLog;
use crate::app::error::{ServiceError, ServiceResult};
use crate::app::rate_limiter::{RateLimiter, RateWindow};
use crate::domain::activity::ActivityKind;
use crate::domain::chat::{attachment_prefix, Category, ChatDraft, ChatMessage};
use crate::domain::user::{Role, User};
use crate::infra::db::Db;
use crate::infra::storage::ObjectStorage;

const MESSAGE_COLUMNS: &str =
    "id, text, category, sender_id, sender_name, sender_role, attachments, is_read, created_at";

const FEED_CAPACITY: usize = 64;

/// Change notifications for live chat subscribers. Subscribers re-read the
/// whole window on every tick rather than applying diffs.
#[derive(Clone)]
pub struct ChatFeed {
    sender: broadcast::Sender<ChatChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatChange {
    Sent(Uuid),
    Read(Uuid),
    Deleted(Uuid),
}

impl ChatFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatChange> {
        self.sender.subscribe()
    }

    pub fn notify(&self, change: ChatChange) {
        // No receivers is fine.
        let _ = self.sender.send(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChatFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct AttachmentUpload {
    pub object_key: String,
    pub upload_url: String,
    pub expires_in_seconds: u64,
    pub headers: Vec<UploadHeader>,
}

#[derive(Debug, Serialize)]
pub struct UploadHeader {
    pub name: String,
    pub value: String,
}

#[derive(Clone)]
pub struct ChatService {
    db: Db,
    limiter: RateLimiter,
    storage: ObjectStorage,
    feed: ChatFeed,
    activity: ActivityLog,
    messages_per_minute: u32,
}

impl ChatService {
    pub fn new(
        db: Db,
        limiter: RateLimiter,
        storage: ObjectStorage,
        feed: ChatFeed,
        activity: ActivityLog,
        messages_per_minute: u32,
    ) -> Self {
        Self {
            db,
            limiter,
            storage,
            feed,
            activity,
            messages_per_minute,
        }
    }

    pub async fn send(&self, sender: &User, draft: ChatDraft) -> ServiceResult<ChatMessage> {
        let draft = draft
            .validate(sender.id)
            .map_err(|err| ServiceError::invalid(err.message()))?;

        let limited = self
            .limiter
            .hit_user(sender.id, "chat", self.messages_per_minute, RateWindow::Minute)
            .await?;
        if limited {
            return Err(ServiceError::QuotaExceeded);
        }

        // created_at comes from the database clock, never the client.
        let row = sqlx::query(&format!(
            "INSERT INTO chat_messages (text, category, sender_id, sender_name, sender_role, attachments) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(&draft.text)
        .bind(draft.category.as_db())
        .bind(sender.id)
        .bind(&sender.display_name)
        .bind(sender.role.as_db())
        .bind(&draft.attachments)
        .fetch_one(self.db.pool())
        .await?;
        let message = message_from_row(&row);

        self.feed.notify(ChatChange::Sent(message.id));
        self.activity
            .record(
                sender.id,
                ActivityKind::MessageSent,
                json!({ "message_id": message.id, "category": message.category.as_db() }),
            )
            .await;

        Ok(message)
    }

    /// The most recent `limit` messages, oldest first.
    pub async fn recent(&self, limit: i64, category: Option<Category>) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_messages \
             WHERE ($1::text IS NULL OR category = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2",
            MESSAGE_COLUMNS
        ))
        .bind(category.map(|category| category.as_db()))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(chronological(rows.iter().map(message_from_row).collect()))
    }

    pub async fn mark_read(&self, message_id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query(
            "UPDATE chat_messages SET is_read = true WHERE id = $1 AND is_read = false",
        )
        .bind(message_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            self.feed.notify(ChatChange::Read(message_id));
            return Ok(true);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM chat_messages WHERE id = $1)")
                .bind(message_id)
                .fetch_one(self.db.pool())
                .await?;
        if exists {
            Ok(false)
        } else {
            Err(ServiceError::NotFound)
        }
    }

    /// Senders may delete their own messages; admins may delete any.
    pub async fn delete(&self, message_id: Uuid, actor: &User) -> ServiceResult<()> {
        let sender_id: Option<Uuid> =
            sqlx::query_scalar("SELECT sender_id FROM chat_messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(self.db.pool())
                .await?;
        let sender_id = sender_id.ok_or(ServiceError::NotFound)?;

        if !can_delete(sender_id, actor) {
            return Err(ServiceError::PermissionDenied);
        }

        let result = sqlx::query("DELETE FROM chat_messages WHERE id = $1")
            .bind(message_id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }

        self.feed.notify(ChatChange::Deleted(message_id));
        self.activity
            .record(
                actor.id,
                ActivityKind::MessageDeleted,
                json!({ "message_id": message_id, "sender_id": sender_id }),
            )
            .await;

        Ok(())
    }

    pub async fn create_attachment_upload(
        &self,
        sender_id: Uuid,
        content_type: &str,
        bytes: i64,
        max_bytes: i64,
        expires_in_seconds: u64,
    ) -> ServiceResult<AttachmentUpload> {
        let ext = attachment_extension(content_type)
            .ok_or_else(|| ServiceError::invalid("unsupported attachment type"))?;
        if bytes <= 0 || bytes > max_bytes {
            return Err(ServiceError::invalid(format!(
                "attachment must be between 1 and {} bytes",
                max_bytes
            )));
        }

        let object_key = format!("{}{}.{}", attachment_prefix(sender_id), Uuid::new_v4(), ext);
        let presigned = self
            .storage
            .presign_put(&object_key, content_type, bytes, expires_in_seconds)
            .await?;

        Ok(AttachmentUpload {
            object_key,
            upload_url: presigned.url,
            expires_in_seconds,
            headers: presigned
                .headers
                .into_iter()
                .map(|(name, value)| UploadHeader { name, value })
                .collect(),
        })
    }

    pub fn feed(&self) -> &ChatFeed {
        &self.feed
    }
}

/// Reverses a newest-first page into display order.
pub fn chronological(mut newest_first: Vec<ChatMessage>) -> Vec<ChatMessage> {
    newest_first.reverse();
    newest_first
}

pub fn can_delete(sender_id: Uuid, actor: &User) -> bool {
    sender_id == actor.id || actor.is_admin()
}

fn attachment_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

fn message_from_row(row: &PgRow) -> ChatMessage {
    let category: String = row.get("category");
    let sender_role: String = row.get("sender_role");
    ChatMessage {
        id: row.get("id"),
        text: row.get("text"),
        category: Category::from_db(&category).unwrap_or(Category::General),
        sender_id: row.get("sender_id"),
        sender_name: row.get("sender_name"),
        sender_role: Role::from_db(&sender_role).unwrap_or(Role::Staff),
        attachments: row.get("attachments"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}
