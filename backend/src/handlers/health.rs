use actix_web::{get, web, HttpResponse, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::repositories::ParticipationStore;

#[get("/health")]
pub async fn health_check(store: web::Data<Arc<dyn ParticipationStore>>) -> Result<HttpResponse> {
    match store.health_check().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "status": "healthy",
            "service": "aurora-addict-backend",
            "version": env!("CARGO_PKG_VERSION")
        }))),
        Err(e) => {
            error!("Health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "unhealthy",
                "service": "aurora-addict-backend",
                "version": env!("CARGO_PKG_VERSION")
            })))
        }
    }
}
