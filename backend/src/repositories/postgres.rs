use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{ParticipationStore, StoreTx};
use crate::error::AppError;
use crate::models::{Hunt, HuntCounts, Participant, ParticipationState, User};

const HUNT_COLUMNS: &str = "id, user_id, title, description, location, timezone, start_date, end_date, \
     is_paid, price, capacity, requires_approval, started_at, created_at, updated_at";

const PARTICIPANT_COLUMNS: &str =
    "id, hunt_id, user_id, status, payment_status, joined_at, paid_at, seq, updated_at";

const USER_COLUMNS: &str =
    "id, username, email, role, cached_hunts_joined_count, created_at, updated_at";

/// Postgres-backed store. The per-hunt lock is a `FOR UPDATE` row lock on the hunt.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ParticipationStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_hunt(&self, hunt_id: Uuid) -> Result<Option<Hunt>, AppError> {
        let hunt = sqlx::query_as::<_, Hunt>(&format!("SELECT {} FROM hunts WHERE id = $1", HUNT_COLUMNS))
            .bind(hunt_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(hunt)
    }

    async fn hunt_counts(&self, hunt_id: Uuid) -> Result<HuntCounts, AppError> {
        let counts = sqlx::query_as::<_, HuntCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
                COUNT(*) FILTER (WHERE status = 'waitlisted') AS waitlisted,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending
            FROM participants
            WHERE hunt_id = $1
            "#,
        )
        .bind(hunt_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn list_participants(&self, hunt_id: Uuid) -> Result<Vec<Participant>, AppError> {
        let participants = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM participants WHERE hunt_id = $1 ORDER BY joined_at, seq",
            PARTICIPANT_COLUMNS
        ))
        .bind(hunt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn find_participant(&self, hunt_id: Uuid, user_id: Uuid) -> Result<Option<Participant>, AppError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM participants WHERE hunt_id = $1 AND user_id = $2",
            PARTICIPANT_COLUMNS
        ))
        .bind(hunt_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn stale_participants(&self, cutoff: DateTime<Utc>) -> Result<Vec<Participant>, AppError> {
        let participants = sqlx::query_as::<_, Participant>(&format!(
            r#"
            SELECT {} FROM participants
            WHERE joined_at < $1
              AND (
                  status = 'pending'
                  OR (
                      status = 'waitlisted'
                      AND hunt_id IN (SELECT id FROM hunts WHERE started_at IS NULL)
                  )
              )
            ORDER BY joined_at, seq
            "#,
            PARTICIPANT_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn hunts_to_freeze(&self, freeze_before: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let hunt_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM hunts WHERE started_at IS NULL AND start_date <= $1 ORDER BY start_date",
        )
        .bind(freeze_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(hunt_ids)
    }

    async fn hunts_with_promotable_waitlist(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let hunt_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT h.id
            FROM hunts h
            WHERE h.started_at IS NULL
              AND h.start_date > $1
              AND EXISTS (
                  SELECT 1 FROM participants p
                  WHERE p.hunt_id = h.id AND p.status = 'waitlisted'
              )
              AND (
                  h.capacity IS NULL
                  OR h.capacity > (
                      SELECT COUNT(*) FROM participants p
                      WHERE p.hunt_id = h.id AND p.status = 'confirmed'
                  )
              )
            ORDER BY h.start_date
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(hunt_ids)
    }

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let user_ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(user_ids)
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_hunt(&mut self, hunt_id: Uuid) -> Result<Option<Hunt>, AppError> {
        let hunt = sqlx::query_as::<_, Hunt>(&format!(
            "SELECT {} FROM hunts WHERE id = $1 FOR UPDATE",
            HUNT_COLUMNS
        ))
        .bind(hunt_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(hunt)
    }

    async fn insert_hunt(&mut self, hunt: &Hunt) -> Result<Hunt, AppError> {
        let created = sqlx::query_as::<_, Hunt>(&format!(
            r#"
            INSERT INTO hunts (id, user_id, title, description, location, timezone, start_date, end_date,
                               is_paid, price, capacity, requires_approval)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            HUNT_COLUMNS
        ))
        .bind(hunt.id)
        .bind(hunt.user_id)
        .bind(&hunt.title)
        .bind(&hunt.description)
        .bind(&hunt.location)
        .bind(&hunt.timezone)
        .bind(hunt.start_date)
        .bind(hunt.end_date)
        .bind(hunt.is_paid)
        .bind(hunt.price)
        .bind(hunt.capacity)
        .bind(hunt.requires_approval)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(created)
    }

    async fn update_hunt(&mut self, hunt: &Hunt) -> Result<Hunt, AppError> {
        let updated = sqlx::query_as::<_, Hunt>(&format!(
            r#"
            UPDATE hunts
            SET title = $2, description = $3, location = $4, timezone = $5,
                start_date = $6, end_date = $7, capacity = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            HUNT_COLUMNS
        ))
        .bind(hunt.id)
        .bind(&hunt.title)
        .bind(&hunt.description)
        .bind(&hunt.location)
        .bind(&hunt.timezone)
        .bind(hunt.start_date)
        .bind(hunt.end_date)
        .bind(hunt.capacity)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(updated)
    }

    async fn mark_hunt_started(&mut self, hunt_id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE hunts SET started_at = $2, updated_at = NOW() WHERE id = $1 AND started_at IS NULL",
        )
        .bind(hunt_id)
        .bind(at)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_confirmed(&mut self, hunt_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM participants WHERE hunt_id = $1 AND status = 'confirmed'",
        )
        .bind(hunt_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn find_participant(&mut self, hunt_id: Uuid, user_id: Uuid) -> Result<Option<Participant>, AppError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM participants WHERE hunt_id = $1 AND user_id = $2",
            PARTICIPANT_COLUMNS
        ))
        .bind(hunt_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(participant)
    }

    async fn find_participant_by_id(&mut self, participant_id: Uuid) -> Result<Option<Participant>, AppError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM participants WHERE id = $1",
            PARTICIPANT_COLUMNS
        ))
        .bind(participant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(participant)
    }

    async fn insert_participant(
        &mut self,
        hunt_id: Uuid,
        user_id: Uuid,
        state: ParticipationState,
        joined_at: DateTime<Utc>,
    ) -> Result<Participant, AppError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            r#"
            INSERT INTO participants (hunt_id, user_id, status, payment_status, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PARTICIPANT_COLUMNS
        ))
        .bind(hunt_id)
        .bind(user_id)
        .bind(state.status)
        .bind(state.payment_status)
        .bind(joined_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(participant)
    }

    async fn reset_participant(
        &mut self,
        participant_id: Uuid,
        state: ParticipationState,
        joined_at: DateTime<Utc>,
    ) -> Result<Participant, AppError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            r#"
            UPDATE participants
            SET status = $2, payment_status = $3, joined_at = $4, paid_at = NULL,
                seq = nextval(pg_get_serial_sequence('participants', 'seq')), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PARTICIPANT_COLUMNS
        ))
        .bind(participant_id)
        .bind(state.status)
        .bind(state.payment_status)
        .bind(joined_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(participant)
    }

    async fn save_participant(&mut self, participant: &Participant) -> Result<Participant, AppError> {
        let saved = sqlx::query_as::<_, Participant>(&format!(
            r#"
            UPDATE participants
            SET status = $2, payment_status = $3, paid_at = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PARTICIPANT_COLUMNS
        ))
        .bind(participant.id)
        .bind(participant.status)
        .bind(participant.payment_status)
        .bind(participant.paid_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(saved)
    }

    async fn delete_participant(&mut self, participant_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(participant_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn next_waitlisted(&mut self, hunt_id: Uuid) -> Result<Option<Participant>, AppError> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            r#"
            SELECT {} FROM participants
            WHERE hunt_id = $1 AND status = 'waitlisted'
            ORDER BY joined_at, seq
            LIMIT 1
            "#,
            PARTICIPANT_COLUMNS
        ))
        .bind(hunt_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(participant)
    }

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn adjust_joined_count(&mut self, user_id: Uuid, delta: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET cached_hunts_joined_count = GREATEST(cached_hunts_joined_count + $2, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn count_user_confirmed(&mut self, user_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM participants WHERE user_id = $1 AND status = 'confirmed'",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn set_joined_count(&mut self, user_id: Uuid, count: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET cached_hunts_joined_count = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(count)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
