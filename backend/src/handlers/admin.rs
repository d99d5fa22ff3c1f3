use actix_web::{post, web, HttpResponse, Result};
use aurora_addict_shared::ERROR_FORBIDDEN;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{AdminPolicy, AuthenticatedUser};
use crate::services::CounterService;

fn require_admin(user: &AuthenticatedUser, policy: &AdminPolicy) -> Result<(), AppError> {
    if user.is_admin(policy) {
        Ok(())
    } else {
        Err(AppError::Forbidden(ERROR_FORBIDDEN.to_string()))
    }
}

/// Recompute one user's cached joined-hunts counter
#[post("/users/{user_id}/recompute-counters")]
pub async fn recompute_user_counters(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    policy: web::Data<AdminPolicy>,
    counter_service: web::Data<CounterService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user, &policy)?;

    let target = path.into_inner();
    info!("Admin {} recomputing counters for user {}", user.user_id, target);

    let response = counter_service.recompute_cached_counters(target).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Recompute every user's cached counter
#[post("/recompute-counters")]
pub async fn recompute_all_counters(
    user: AuthenticatedUser,
    policy: web::Data<AdminPolicy>,
    counter_service: web::Data<CounterService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&user, &policy)?;

    info!("Admin {} recomputing counters for all users", user.user_id);

    let response = counter_service.recompute_all_cached_counters().await?;
    Ok(HttpResponse::Ok().json(response))
}
