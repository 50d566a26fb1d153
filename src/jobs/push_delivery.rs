use anyhow::Result;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::app::notifications::NotificationService;
use crate::app::router::{present_push, Presentation};
use crate::domain::notification::PushMessage;
use crate::infra::queue::QueueClient;

const POLL_WAIT_SECONDS: i32 = 10;
const IDLE_SLEEP_MS: u64 = 200;
const ERROR_BACKOFF_MS: u64 = 1000;

#[derive(Debug)]
pub enum DeliveryOutcome {
    Presented(Presentation),
    /// The notification was already delivered by an earlier copy of the
    /// message.
    Duplicate,
}

pub async fn run(notifications: NotificationService, queue: QueueClient) -> Result<()> {
    info!("push delivery worker started");
    loop {
        match queue.receive_push(POLL_WAIT_SECONDS).await {
            Ok(Some(received)) => {
                match deliver(&notifications, &received.message).await {
                    Ok(DeliveryOutcome::Presented(presentation)) => {
                        info!(
                            notification_id = ?received.message.data.notification_id,
                            destination = presentation.destination,
                            actions = presentation.actions.len(),
                            requires_interaction = presentation.requires_interaction,
                            "push notification delivered"
                        );
                    }
                    Ok(DeliveryOutcome::Duplicate) => {
                        info!(
                            notification_id = ?received.message.data.notification_id,
                            "skipping already delivered notification"
                        );
                    }
                    Err(err) => {
                        error!(
                            error = ?err,
                            notification_id = ?received.message.data.notification_id,
                            "failed to deliver push notification"
                        );
                    }
                }

                // Consumed once, success or not. No retries.
                if let Err(err) = queue.delete_message(&received.receipt_handle).await {
                    warn!(error = ?err, "failed to delete queue message");
                }
            }
            Ok(None) => {
                tokio::time::sleep(Duration::from_millis(IDLE_SLEEP_MS)).await;
            }
            Err(err) => {
                warn!(error = ?err, "queue receive failed, backing off");
                tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
            }
        }
    }
}

async fn deliver(
    notifications: &NotificationService,
    message: &PushMessage,
) -> Result<DeliveryOutcome> {
    let presentation = present_push(message);

    if let Some(notification_id) = message.data.notification_id {
        if !notifications.mark_delivered(notification_id).await? {
            return Ok(DeliveryOutcome::Duplicate);
        }
    }

    Ok(DeliveryOutcome::Presented(presentation))
}
