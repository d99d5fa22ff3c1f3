use actix_web::{post, web, HttpRequest, HttpResponse, Result};
use aurora_addict_shared::{SweepResponse, ERROR_UNAUTHORIZED};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::services::SweepService;
use crate::utils::verify_shared_secret;

/// Shared secret external schedulers present as `Authorization: Bearer <secret>`
#[derive(Clone)]
pub struct CronSecret(pub String);

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[post("/sweep")]
pub async fn run_sweep(
    req: HttpRequest,
    secret: web::Data<CronSecret>,
    sweep_service: web::Data<SweepService>,
) -> Result<HttpResponse, AppError> {
    let authorized = bearer_token(&req)
        .map(|token| verify_shared_secret(token, &secret.0))
        .unwrap_or(false);
    if !authorized {
        warn!("Rejected sweep trigger without a valid cron secret");
        return Err(AppError::Authentication(ERROR_UNAUTHORIZED.to_string()));
    }

    // Schedulers always get the summary shape, even when the sweep fails
    let now = Utc::now();
    match sweep_service.run_sweep(now).await {
        Ok(report) => {
            info!("Cron sweep processed {} records", report.processed_count);
            Ok(HttpResponse::Ok().json(SweepResponse::completed(report.processed_count, now)))
        }
        Err(e) => {
            error!("Cron sweep failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(SweepResponse::failed(now)))
        }
    }
}
