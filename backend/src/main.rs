use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aurora_addict_backend::config::AppConfig;
use aurora_addict_backend::database::Database;
use aurora_addict_backend::error::AppError;
use aurora_addict_backend::repositories::{ParticipationStore, PgStore};
use aurora_addict_backend::services::EventBus;
use aurora_addict_backend::utils::jwt::JwtService;
use aurora_addict_backend::{configure_routes, AppState};

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Starting AuroraAddict backend on {}:{}", config.host, config.port);

    // Initialize database
    let database = Database::new(&config.database_url, config.database_max_connections).await?;

    // Run migrations
    database.migrate().await?;

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret)?);

    // Initialize services
    let store: Arc<dyn ParticipationStore> = Arc::new(PgStore::new(database.pool().clone()));
    let events = EventBus::new();
    events.start_chat_membership_listener();

    let state = AppState::new(store, events, &config);
    if let Some(every) = config.sweep_interval() {
        state.sweep.start_background_tasks(every);
    }

    let bind_address = (config.host.clone(), config.port);

    // Start HTTP server
    HttpServer::new(move || {
        let state = state.clone();
        let jwt_service = jwt_service.clone();

        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(move |cfg| configure_routes(cfg, &state, jwt_service))
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}
