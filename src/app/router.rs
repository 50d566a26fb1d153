use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::notifications::NotificationService;
use crate::app::requests::RequestService;
use crate::app::shifts::ShiftService;
use crate::domain::notification::{Notification, NotificationKind, Priority, PushMessage};
use crate::domain::request::{AdminRequest, Outcome};
use crate::domain::shift::ShiftAssignment;
use crate::domain::user::User;

pub const SCHEDULE_LINK: &str = "/staff-dashboard?tab=schedule";
pub const STAFF_REQUESTS_LINK: &str = "/staff-dashboard?tab=requests";
pub const NOTIFICATIONS_LINK: &str = "/staff-dashboard?tab=notifications";
pub const ADMIN_REQUESTS_LINK: &str = "/admin-dashboard?tab=requests";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Decline,
    Approve,
    Reject,
}

impl Action {
    pub fn title(&self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Decline => "Decline",
            Self::Approve => "Approve",
            Self::Reject => "Reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub action: Action,
    pub title: &'static str,
}

/// Everything a client needs to show a notification.
#[derive(Debug, Clone, Serialize)]
pub struct Presentation {
    pub title: String,
    pub body: String,
    pub actions: Vec<ActionButton>,
    pub destination: &'static str,
    pub requires_interaction: bool,
}

pub fn actions_for(kind: Option<NotificationKind>) -> &'static [Action] {
    match kind {
        Some(NotificationKind::ShiftAssigned) => &[Action::View, Action::Decline],
        Some(NotificationKind::LeaveRequest) | Some(NotificationKind::AdminRequest) => {
            &[Action::Approve, Action::Reject]
        }
        Some(NotificationKind::ScheduleChange) => &[Action::View],
        _ => &[],
    }
}

pub fn destination_for(kind: Option<NotificationKind>) -> &'static str {
    match kind {
        Some(NotificationKind::ShiftAssigned) | Some(NotificationKind::ScheduleChange) => {
            SCHEDULE_LINK
        }
        Some(NotificationKind::LeaveApproved) | Some(NotificationKind::LeaveRejected) => {
            STAFF_REQUESTS_LINK
        }
        Some(NotificationKind::LeaveRequest) | Some(NotificationKind::AdminRequest) => {
            ADMIN_REQUESTS_LINK
        }
        _ => NOTIFICATIONS_LINK,
    }
}

pub fn present(kind: Option<&str>, priority: Priority, title: &str, body: &str) -> Presentation {
    let kind = kind.and_then(NotificationKind::parse);
    Presentation {
        title: title.to_string(),
        body: body.to_string(),
        actions: actions_for(kind)
            .iter()
            .map(|action| ActionButton {
                action: *action,
                title: action.title(),
            })
            .collect(),
        destination: destination_for(kind),
        requires_interaction: priority == Priority::High,
    }
}

pub fn present_push(message: &PushMessage) -> Presentation {
    let priority = message
        .data
        .priority
        .as_deref()
        .map(Priority::parse)
        .unwrap_or_default();
    present(
        message.data.kind.as_deref(),
        priority,
        &message.notification.title,
        &message.notification.body,
    )
}

pub fn present_notification(notification: &Notification) -> Presentation {
    present(
        Some(&notification.notification_type),
        notification.priority,
        &notification.title,
        &notification.body,
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ClickTarget {
    /// An app window is already open; bring it forward and navigate it.
    Focus { window: String, url: String },
    Open { url: String },
}

pub fn resolve_click(open_windows: &[String], origin: &Url, destination: &str) -> ClickTarget {
    let url = origin
        .join(destination)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("{}{}", origin.as_str().trim_end_matches('/'), destination));

    let same_origin = open_windows.iter().find(|window| {
        Url::parse(window)
            .map(|parsed| parsed.origin() == origin.origin())
            .unwrap_or(false)
    });

    match same_origin {
        Some(window) => ClickTarget::Focus {
            window: window.clone(),
            url,
        },
        None => ClickTarget::Open { url },
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Dispatched {
    Viewed { destination: &'static str },
    Decided { request: AdminRequest },
    Declined { shift: ShiftAssignment },
}

/// Runs the handler behind a notification action button.
#[derive(Clone)]
pub struct NotificationRouter {
    notifications: NotificationService,
    requests: RequestService,
    shifts: ShiftService,
}

impl NotificationRouter {
    pub fn new(
        notifications: NotificationService,
        requests: RequestService,
        shifts: ShiftService,
    ) -> Self {
        Self {
            notifications,
            requests,
            shifts,
        }
    }

    pub async fn dispatch(
        &self,
        notification_id: Uuid,
        action: Action,
        actor: &User,
    ) -> ServiceResult<Dispatched> {
        let notification = self
            .notifications
            .get(notification_id, actor.id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let kind = notification.kind();
        if !actions_for(kind).contains(&action) {
            return Err(ServiceError::invalid(format!(
                "action '{}' is not available for this notification",
                action.title().to_lowercase()
            )));
        }

        let dispatched = match action {
            Action::View => Dispatched::Viewed {
                destination: destination_for(kind),
            },
            Action::Approve | Action::Reject => {
                let request_id = notification
                    .payload_uuid("request_id")
                    .ok_or_else(|| ServiceError::invalid("notification has no request"))?;
                let outcome = if action == Action::Approve {
                    Outcome::Approve
                } else {
                    Outcome::Reject
                };
                let request = self.requests.decide(request_id, outcome, actor).await?;
                Dispatched::Decided { request }
            }
            Action::Decline => {
                let shift_id = notification
                    .payload_uuid("shift_id")
                    .ok_or_else(|| ServiceError::invalid("notification has no shift"))?;
                let shift = self.shifts.decline(shift_id, actor.id).await?;
                Dispatched::Declined { shift }
            }
        };

        if let Err(err) = self.notifications.mark_read(notification.id, actor.id).await {
            tracing::warn!(error = ?err, notification_id = %notification.id, "failed to mark dispatched notification read");
        }

        Ok(dispatched)
    }
}
