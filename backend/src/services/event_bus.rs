use aurora_addict_shared::PARTICIPATION_EVENT_BUFFER;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Facts published after a participation change commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParticipationEvent {
    ParticipantConfirmed {
        hunt_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    },
    ParticipantWaitlisted {
        hunt_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    },
    ParticipantCancelled {
        hunt_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    },
}

/// Broadcast channel for participation events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ParticipationEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PARTICIPATION_EVENT_BUFFER);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParticipationEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ParticipationEvent) {
        // No subscribers is not an error
        if self.sender.send(event).is_err() {
            debug!("Participation event dropped, no subscribers");
        }
    }

    pub fn publish_all(&self, events: Vec<ParticipationEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Hands confirmed participants over to hunt chat membership
    pub fn start_chat_membership_listener(&self) {
        let mut receiver = self.subscribe();

        tokio::spawn(async move {
            info!("Started chat membership listener");

            loop {
                match receiver.recv().await {
                    Ok(ParticipationEvent::ParticipantConfirmed { hunt_id, user_id, .. }) => {
                        info!("Adding user {} to chat for hunt {}", user_id, hunt_id);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Chat membership listener lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            warn!("Chat membership listener stopped");
        });
    }
}
