//! AuroraAddict hunt participation backend: joining hunts, the waitlist,
//! the paid-hunt payment sub-states, the lifecycle sweep and the cached
//! joined-hunts counter.

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod services;
pub mod utils;

use actix_web::web;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::handlers::cron::CronSecret;
use crate::middleware::auth::{AdminPolicy, AuthMiddleware};
use crate::repositories::ParticipationStore;
use crate::services::{CounterService, EventBus, HuntService, ParticipationService, SweepConfig, SweepService};
use crate::utils::jwt::JwtService;

/// Everything the HTTP layer shares across workers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ParticipationStore>,
    pub events: EventBus,
    pub participation: ParticipationService,
    pub hunts: HuntService,
    pub counters: CounterService,
    pub sweep: SweepService,
    pub admin_policy: AdminPolicy,
    pub cron_secret: CronSecret,
}

impl AppState {
    pub fn new(store: Arc<dyn ParticipationStore>, events: EventBus, config: &AppConfig) -> Self {
        Self {
            participation: ParticipationService::new(store.clone(), events.clone()),
            hunts: HuntService::new(store.clone(), events.clone()),
            counters: CounterService::new(store.clone()),
            sweep: SweepService::new(store.clone(), events.clone(), SweepConfig::from_app_config(config)),
            admin_policy: AdminPolicy::new(config.admin_email_set()),
            cron_secret: CronSecret(config.cron_secret.clone()),
            store,
            events,
        }
    }
}

/// Registers shared state and every `/api/v1` route
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState, jwt_service: Arc<JwtService>) {
    cfg.app_data(web::Data::new(state.store.clone()))
        .app_data(web::Data::new(state.participation.clone()))
        .app_data(web::Data::new(state.hunts.clone()))
        .app_data(web::Data::new(state.counters.clone()))
        .app_data(web::Data::new(state.sweep.clone()))
        .app_data(web::Data::new(state.admin_policy.clone()))
        .app_data(web::Data::new(state.cron_secret.clone()))
        .service(
            web::scope("/api/v1")
                .service(handlers::health::health_check)
                .service(
                    web::scope("/cron").service(handlers::cron::run_sweep),
                )
                .service(
                    web::scope("/admin")
                        .wrap(AuthMiddleware::new(jwt_service.clone()))
                        .service(handlers::admin::recompute_user_counters)
                        .service(handlers::admin::recompute_all_counters),
                )
                .service(
                    // Reads are public; handlers taking `AuthenticatedUser` refuse anonymous callers
                    web::scope("/hunts")
                        .wrap(AuthMiddleware::optional(jwt_service))
                        .service(handlers::hunts::create_hunt)
                        .service(handlers::participants::list_participants)
                        .service(handlers::participants::get_participation)
                        .service(handlers::participants::join_hunt)
                        .service(handlers::participants::leave_hunt)
                        .service(handlers::participants::mark_paid)
                        .service(handlers::participants::resolve_payment)
                        .service(handlers::participants::review_join_request)
                        .service(handlers::participants::remove_participant)
                        .service(handlers::hunts::get_hunt)
                        .service(handlers::hunts::update_hunt),
                ),
        );
}
