use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ShiftAssigned,
    LeaveRequest,
    ScheduleChange,
    LeaveApproved,
    LeaveRejected,
    AdminRequest,
    AdminRequestApproved,
    AdminRequestRejected,
}

impl NotificationKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "shift_assigned" => Some(Self::ShiftAssigned),
            "leave_request" => Some(Self::LeaveRequest),
            "schedule_change" => Some(Self::ScheduleChange),
            "leave_approved" => Some(Self::LeaveApproved),
            "leave_rejected" => Some(Self::LeaveRejected),
            "admin_request" => Some(Self::AdminRequest),
            "admin_request_approved" => Some(Self::AdminRequestApproved),
            "admin_request_rejected" => Some(Self::AdminRequestRejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShiftAssigned => "shift_assigned",
            Self::LeaveRequest => "leave_request",
            Self::ScheduleChange => "schedule_change",
            Self::LeaveApproved => "leave_approved",
            Self::LeaveRejected => "leave_rejected",
            Self::AdminRequest => "admin_request",
            Self::AdminRequestApproved => "admin_request_approved",
            Self::AdminRequestRejected => "admin_request_rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Unknown values fall back to `Normal`.
    pub fn parse(value: &str) -> Self {
        match value {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Normal,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Kept as text so rows written by newer producers still load.
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub payload: Value,
    pub priority: Priority,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Notification {
    pub fn kind(&self) -> Option<NotificationKind> {
        NotificationKind::parse(&self.notification_type)
    }

    pub fn payload_uuid(&self, field: &str) -> Option<Uuid> {
        self.payload
            .get(field)
            .and_then(Value::as_str)
            .and_then(|value| Uuid::parse_str(value).ok())
    }
}

/// A notification to be written for one recipient.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: Value,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushData {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape of a push delivery message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub notification: PushNotification,
    #[serde(default)]
    pub data: PushData,
}

impl From<&Notification> for PushMessage {
    fn from(notification: &Notification) -> Self {
        let extra = match &notification.payload {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        Self {
            notification: PushNotification {
                title: notification.title.clone(),
                body: notification.body.clone(),
            },
            data: PushData {
                kind: Some(notification.notification_type.clone()),
                priority: Some(notification.priority.as_db().to_string()),
                notification_id: Some(notification.id),
                user_id: Some(notification.user_id),
                extra,
            },
        }
    }
}
