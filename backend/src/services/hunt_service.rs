use aurora_addict_shared::{
    CreateHuntRequest, HuntResponse, UpdateHuntRequest, ERROR_HUNT_NOT_FOUND, ERROR_ORGANIZER_ONLY,
    ERROR_USER_NOT_FOUND,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::Hunt;
use crate::repositories::{complete, ParticipationStore};
use crate::services::event_bus::EventBus;
use crate::services::participation_service::{fill_free_slots, lock_hunt};

/// Hunt creation and organizer edits
#[derive(Clone)]
pub struct HuntService {
    store: Arc<dyn ParticipationStore>,
    events: EventBus,
}

impl HuntService {
    pub fn new(store: Arc<dyn ParticipationStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub async fn create_hunt(&self, organizer_id: Uuid, request: CreateHuntRequest) -> Result<Hunt, AppError> {
        request.validate()?;

        let hunt = Hunt::from_request(organizer_id, &request);
        let mut tx = self.store.begin().await?;
        let result: Result<Hunt, AppError> = async {
            if tx.find_user(organizer_id).await?.is_none() {
                return Err(AppError::NotFound(ERROR_USER_NOT_FOUND.to_string()));
            }
            tx.insert_hunt(&hunt).await
        }
        .await;
        let created = complete(tx, result).await?;

        info!("Organizer {} created hunt {}", organizer_id, created.id);
        Ok(created)
    }

    pub async fn get_hunt(&self, hunt_id: Uuid) -> Result<HuntResponse, AppError> {
        let hunt = self
            .store
            .find_hunt(hunt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(ERROR_HUNT_NOT_FOUND.to_string()))?;
        let counts = self.store.hunt_counts(hunt_id).await?;
        Ok(hunt.to_response(counts))
    }

    /// Applies an organizer edit. Raising capacity hands the new seats to the
    /// waitlist in the same transaction.
    pub async fn update_hunt(
        &self,
        organizer_id: Uuid,
        hunt_id: Uuid,
        request: UpdateHuntRequest,
    ) -> Result<HuntResponse, AppError> {
        request.validate()?;

        let now = Utc::now();
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<(Hunt, usize), AppError> = async {
            let mut hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            if !hunt.is_organizer(organizer_id) {
                return Err(AppError::Forbidden(ERROR_ORGANIZER_ONLY.to_string()));
            }

            if let Some(capacity) = request.capacity {
                let confirmed = tx.count_confirmed(hunt_id).await?;
                if i64::from(capacity) < confirmed {
                    return Err(AppError::Validation(format!(
                        "Capacity cannot be lower than the {} confirmed participants",
                        confirmed
                    )));
                }
            }

            hunt.apply_update(&request)?;
            let updated = tx.update_hunt(&hunt).await?;
            let promoted = fill_free_slots(tx.as_mut(), &updated, now, &mut events).await?;
            Ok((updated, promoted.len()))
        }
        .await;
        let (hunt, promoted) = complete(tx, result).await?;
        self.events.publish_all(events);

        info!(
            "Organizer {} updated hunt {}, {} promoted from waitlist",
            organizer_id, hunt.id, promoted
        );

        let counts = self.store.hunt_counts(hunt_id).await?;
        Ok(hunt.to_response(counts))
    }
}
