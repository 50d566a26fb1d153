use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::Role;

pub const MAX_TEXT_CHARS: usize = 1000;
pub const MIN_URGENT_CHARS: usize = 10;
pub const MAX_ATTACHMENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    Urgent,
    Info,
    Shift,
}

impl Category {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "general" => Some(Self::General),
            "urgent" => Some(Self::Urgent),
            "info" => Some(Self::Info),
            "shift" => Some(Self::Shift),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Urgent => "urgent",
            Self::Info => "info",
            Self::Shift => "shift",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub category: Category,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_role: Role,
    pub attachments: Vec<String>,
    pub is_read: bool,
    /// Assigned by the database at commit time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A message as submitted by a client, before it is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatDraft {
    pub text: String,
    pub category: Category,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    EmptyText,
    TextTooLong,
    UrgentTooShort,
    TooManyAttachments,
    ForeignAttachment,
}

impl DraftError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptyText => "message text is required",
            Self::TextTooLong => "message must be at most 1000 characters",
            Self::UrgentTooShort => "urgent messages must be at least 10 characters",
            Self::TooManyAttachments => "at most 5 attachments are allowed",
            Self::ForeignAttachment => "attachment does not belong to sender",
        }
    }
}

/// Attachment keys are issued under a per-sender prefix.
pub fn attachment_prefix(sender_id: Uuid) -> String {
    format!("chat/{}/", sender_id)
}

impl ChatDraft {
    /// Trims the text and checks it against the message rules.
    pub fn validate(mut self, sender_id: Uuid) -> Result<Self, DraftError> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(DraftError::EmptyText);
        }
        let chars = trimmed.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(DraftError::TextTooLong);
        }
        if self.category == Category::Urgent && chars < MIN_URGENT_CHARS {
            return Err(DraftError::UrgentTooShort);
        }
        if self.attachments.len() > MAX_ATTACHMENTS {
            return Err(DraftError::TooManyAttachments);
        }
        let prefix = attachment_prefix(sender_id);
        if self.attachments.iter().any(|key| !key.starts_with(&prefix)) {
            return Err(DraftError::ForeignAttachment);
        }
        self.text = trimmed.to_string();
        Ok(self)
    }
}
