use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Login,
    MessageSent,
    MessageDeleted,
    RequestSubmitted,
    RequestDecided,
    ShiftDeclined,
}

impl ActivityKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::MessageSent => "message_sent",
            Self::MessageDeleted => "message_deleted",
            Self::RequestSubmitted => "request_submitted",
            Self::RequestDecided => "request_decided",
            Self::ShiftDeclined => "shift_declined",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity: String,
    pub detail: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
