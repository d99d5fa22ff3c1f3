#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use aurora_addict_backend::config::AppConfig;
use aurora_addict_backend::error::AppError;
use aurora_addict_backend::models::{Hunt, HuntCounts, Participant, User};
use aurora_addict_backend::repositories::{MemoryStore, ParticipationStore, StoreTx};
use aurora_addict_backend::services::EventBus;
use aurora_addict_backend::utils::jwt::JwtService;
use aurora_addict_backend::AppState;
use aurora_addict_shared::UserRole;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use serde_json::{json, Value};

pub const JWT_SECRET: &str = "test_jwt_secret_key_for_testing_only_0123";
pub const CRON_SECRET: &str = "test-cron-secret";
pub const ADMIN_EMAIL: &str = "ops@aurora.io";

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        jwt_secret: JWT_SECRET.to_string(),
        cron_secret: CRON_SECRET.to_string(),
        admin_emails: ADMIN_EMAIL.to_string(),
        pending_ttl_days: 7,
        waitlist_freeze_lead_secs: 3600,
        sweep_interval_secs: None,
    }
}

pub struct TestContext {
    pub store: MemoryStore,
    pub state: AppState,
    pub jwt: Arc<JwtService>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        Self::over(store.clone(), Arc::new(store))
    }

    /// Context whose application talks to a failing database
    pub fn offline() -> Self {
        Self::over(MemoryStore::new(), Arc::new(UnreachableStore))
    }

    fn over(store: MemoryStore, backend: Arc<dyn ParticipationStore>) -> Self {
        let state = AppState::new(backend, EventBus::new(), &test_config());
        let jwt = Arc::new(JwtService::new(JWT_SECRET).expect("Failed to create JWT service"));
        Self { store, state, jwt }
    }

    /// Seeds a user and returns it with a bearer header value
    pub async fn user(&self, username: &str, role: UserRole) -> (User, String) {
        self.user_with_email(username, &format!("{}@example.com", username), role).await
    }

    pub async fn user_with_email(&self, username: &str, email: &str, role: UserRole) -> (User, String) {
        let user = self.store.add_user(User::new(username, email, role)).await;
        let token = self
            .jwt
            .generate_access_token(user.id, user.username.clone(), user.email.clone(), user.role)
            .expect("Failed to generate token");
        (user, format!("Bearer {}", token))
    }
}

/// Store whose database is gone; every call fails like a pool timeout
pub struct UnreachableStore;

fn offline_error<T>() -> Result<T, AppError> {
    Err(AppError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl ParticipationStore for UnreachableStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        offline_error()
    }

    async fn health_check(&self) -> Result<(), AppError> {
        offline_error()
    }

    async fn find_hunt(&self, _hunt_id: Uuid) -> Result<Option<Hunt>, AppError> {
        offline_error()
    }

    async fn hunt_counts(&self, _hunt_id: Uuid) -> Result<HuntCounts, AppError> {
        offline_error()
    }

    async fn list_participants(&self, _hunt_id: Uuid) -> Result<Vec<Participant>, AppError> {
        offline_error()
    }

    async fn find_participant(&self, _hunt_id: Uuid, _user_id: Uuid) -> Result<Option<Participant>, AppError> {
        offline_error()
    }

    async fn stale_participants(&self, _cutoff: DateTime<Utc>) -> Result<Vec<Participant>, AppError> {
        offline_error()
    }

    async fn hunts_to_freeze(&self, _freeze_before: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        offline_error()
    }

    async fn hunts_with_promotable_waitlist(&self, _now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        offline_error()
    }

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, AppError> {
        offline_error()
    }
}

pub fn hunt_payload(capacity: Option<i32>, price: Option<f64>) -> Value {
    let start = Utc::now() + Duration::days(3);
    json!({
        "title": "Abisko aurora night",
        "location": "Abisko",
        "timezone": "Europe/Stockholm",
        "startDate": start.to_rfc3339(),
        "endDate": (start + Duration::hours(5)).to_rfc3339(),
        "isPaid": price.is_some(),
        "price": price,
        "capacity": capacity,
        "requiresApproval": false
    })
}

/// Builds the full application over the context's in-memory store
#[macro_export]
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(actix_web::App::new().configure(|cfg| {
            aurora_addict_backend::configure_routes(cfg, &$ctx.state, $ctx.jwt.clone())
        }))
        .await
    };
}
