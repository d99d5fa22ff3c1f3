use aurora_addict_shared::{CounterBackfillResponse, CounterRecomputeResponse, ERROR_USER_NOT_FOUND};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::repositories::{complete, ParticipationStore, StoreTx};

/// Repairs `cached_hunts_joined_count` from the participations it mirrors
#[derive(Clone)]
pub struct CounterService {
    store: Arc<dyn ParticipationStore>,
}

/// Counter value before and after a repair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRepair {
    pub previous: i64,
    pub current: i64,
}

impl CounterRepair {
    pub fn repaired(&self) -> bool {
        self.previous != self.current
    }
}

/// Brings one user's cached counter in line with their confirmed participations.
/// Runs inside the caller's transaction; a drift is logged as a warning.
pub(crate) async fn reconcile_user_counter(tx: &mut dyn StoreTx, user_id: Uuid) -> Result<CounterRepair, AppError> {
    let user = tx
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ERROR_USER_NOT_FOUND.to_string()))?;
    let confirmed = tx.count_user_confirmed(user_id).await?;

    if user.cached_hunts_joined_count != confirmed {
        warn!(
            "Joined counter drift for user {}: cached {}, confirmed {}",
            user_id, user.cached_hunts_joined_count, confirmed
        );
        tx.set_joined_count(user_id, confirmed).await?;
    }

    Ok(CounterRepair {
        previous: user.cached_hunts_joined_count,
        current: confirmed,
    })
}

impl CounterService {
    pub fn new(store: Arc<dyn ParticipationStore>) -> Self {
        Self { store }
    }

    /// Recomputes one user's counter and returns the stored value
    pub async fn recompute_cached_counters(&self, user_id: Uuid) -> Result<CounterRecomputeResponse, AppError> {
        let mut tx = self.store.begin().await?;
        let result = reconcile_user_counter(tx.as_mut(), user_id).await;
        let repair = complete(tx, result).await?;

        info!("Recomputed joined counter for user {}: {}", user_id, repair.current);

        Ok(CounterRecomputeResponse {
            user_id,
            cached_hunts_joined_count: repair.current,
            previous_count: repair.previous,
            repaired: repair.repaired(),
        })
    }

    /// Recomputes every user's counter, one transaction per user
    pub async fn recompute_all_cached_counters(&self) -> Result<CounterBackfillResponse, AppError> {
        let user_ids = self.store.list_user_ids().await?;
        let mut users_repaired = 0;

        for user_id in &user_ids {
            let mut tx = self.store.begin().await?;
            let result = reconcile_user_counter(tx.as_mut(), *user_id).await;
            match complete(tx, result).await {
                Ok(repair) if repair.repaired() => users_repaired += 1,
                Ok(_) => {}
                Err(e) => error!("Failed to recompute joined counter for user {}: {}", user_id, e),
            }
        }

        info!(
            "Joined counter backfill checked {} users, repaired {}",
            user_ids.len(),
            users_repaired
        );

        Ok(CounterBackfillResponse {
            users_checked: user_ids.len(),
            users_repaired,
        })
    }
}
