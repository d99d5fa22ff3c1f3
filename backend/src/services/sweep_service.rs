use aurora_addict_shared::ParticipantStatus;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::Participant;
use crate::repositories::{complete, ParticipationStore};
use crate::services::counter_service::reconcile_user_counter;
use crate::services::event_bus::EventBus;
use crate::services::participation_service::{cancel_locked, fill_free_slots, lock_hunt};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Age after which an unresolved pending participation is cancelled
    pub pending_ttl: Duration,
    /// How long before start the waitlist is frozen
    pub waitlist_freeze_lead: Duration,
}

impl SweepConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            pending_ttl: Duration::days(config.pending_ttl_days),
            waitlist_freeze_lead: Duration::seconds(config.waitlist_freeze_lead_secs),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::days(aurora_addict_shared::DEFAULT_PENDING_TTL_DAYS),
            waitlist_freeze_lead: Duration::seconds(aurora_addict_shared::DEFAULT_WAITLIST_FREEZE_LEAD_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub processed_count: usize,
    pub expired_payments: usize,
    pub expired_requests: usize,
    pub expired_waitlist: usize,
    pub frozen_hunts: usize,
    pub promotions: usize,
}

enum Expiry {
    Payment,
    Request,
    Waitlist,
}

/// Periodic lifecycle pass over pending participations and upcoming hunts
#[derive(Clone)]
pub struct SweepService {
    store: Arc<dyn ParticipationStore>,
    events: EventBus,
    config: SweepConfig,
}

impl SweepService {
    pub fn new(store: Arc<dyn ParticipationStore>, events: EventBus, config: SweepConfig) -> Self {
        Self { store, events, config }
    }

    /// Runs every sweep step once. Individual record failures are logged and
    /// skipped; only failing to list candidates fails the sweep.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let mut report = SweepReport::default();

        let cutoff = now - self.config.pending_ttl;
        for participant in self.store.stale_participants(cutoff).await? {
            match self.expire_participant(&participant, cutoff, now).await {
                Ok(Some((expiry, promotions))) => {
                    match expiry {
                        Expiry::Payment => report.expired_payments += 1,
                        Expiry::Request => report.expired_requests += 1,
                        Expiry::Waitlist => report.expired_waitlist += 1,
                    }
                    report.promotions += promotions;
                }
                Ok(None) => debug!("Participation {} no longer stale", participant.id),
                Err(e) => error!("Failed to expire participation {}: {}", participant.id, e),
            }
        }

        let freeze_before = now + self.config.waitlist_freeze_lead;
        for hunt_id in self.store.hunts_to_freeze(freeze_before).await? {
            match self.freeze_hunt(hunt_id, now).await {
                Ok(true) => report.frozen_hunts += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to freeze waitlist of hunt {}: {}", hunt_id, e),
            }
        }

        for hunt_id in self.store.hunts_with_promotable_waitlist(now).await? {
            match self.promote_hunt(hunt_id, now).await {
                Ok(promotions) => report.promotions += promotions,
                Err(e) => error!("Failed to promote waitlist of hunt {}: {}", hunt_id, e),
            }
        }

        report.processed_count = report.expired_payments
            + report.expired_requests
            + report.expired_waitlist
            + report.frozen_hunts
            + report.promotions;

        info!(
            "Sweep processed {} records: {} payments expired, {} requests expired, {} waitlist entries expired, {} hunts frozen, {} promotions",
            report.processed_count,
            report.expired_payments,
            report.expired_requests,
            report.expired_waitlist,
            report.frozen_hunts,
            report.promotions
        );
        Ok(report)
    }

    /// Cancels one stale pending or waitlisted participation after re-reading
    /// it under the hunt lock. Waitlist entries of a frozen hunt are kept.
    async fn expire_participant(
        &self,
        candidate: &Participant,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<(Expiry, usize)>, AppError> {
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<Option<(Expiry, usize)>, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), candidate.hunt_id).await?;
            let participant = match tx.find_participant_by_id(candidate.id).await? {
                Some(p) if p.joined_at < cutoff => p,
                _ => return Ok(None),
            };

            let expiry = match (participant.status, participant.payment_status) {
                (ParticipantStatus::Pending, Some(_)) => Expiry::Payment,
                (ParticipantStatus::Pending, None) => Expiry::Request,
                (ParticipantStatus::Waitlisted, _) if !hunt.is_waitlist_frozen(now) => Expiry::Waitlist,
                _ => return Ok(None),
            };
            let user_id = participant.user_id;

            let departure = cancel_locked(tx.as_mut(), &hunt, participant, now, &mut events).await?;
            reconcile_user_counter(tx.as_mut(), user_id).await?;

            info!(
                "Expired stale participation of user {} on hunt {}",
                user_id, hunt.id
            );
            Ok(Some((expiry, usize::from(departure.promoted.is_some()))))
        }
        .await;
        let expired = complete(tx, result).await?;
        self.events.publish_all(events);

        Ok(expired)
    }

    async fn freeze_hunt(&self, hunt_id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tx = self.store.begin().await?;
        let result = tx.mark_hunt_started(hunt_id, now).await;
        let frozen = complete(tx, result).await?;

        if frozen {
            info!("Froze waitlist of hunt {} ahead of start", hunt_id);
        }
        Ok(frozen)
    }

    async fn promote_hunt(&self, hunt_id: Uuid, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<usize, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            Ok(fill_free_slots(tx.as_mut(), &hunt, now, &mut events).await?.len())
        }
        .await;
        let promotions = complete(tx, result).await?;
        self.events.publish_all(events);

        Ok(promotions)
    }

    /// Runs the sweep on a fixed interval inside the server process
    pub fn start_background_tasks(&self, every: std::time::Duration) {
        let service = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            loop {
                interval.tick().await;

                match service.run_sweep(Utc::now()).await {
                    Ok(report) => {
                        if report.processed_count > 0 {
                            info!("Scheduled sweep processed {} records", report.processed_count);
                        }
                    }
                    Err(e) => {
                        error!("Scheduled sweep failed: {}", e);
                    }
                }
            }
        });

        info!("Sweep background task started, every {:?}", every);
    }
}
