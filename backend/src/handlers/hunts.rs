use actix_web::{get, patch, post, web, HttpResponse, Result};
use aurora_addict_shared::{CreateHuntRequest, UpdateHuntRequest};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::HuntCounts;
use crate::services::HuntService;

/// Create a hunt organized by the caller
#[post("")]
pub async fn create_hunt(
    user: AuthenticatedUser,
    request: web::Json<CreateHuntRequest>,
    hunt_service: web::Data<HuntService>,
) -> Result<HttpResponse, AppError> {
    debug!("User {} creating hunt", user.user_id);

    let hunt = hunt_service.create_hunt(user.user_id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(hunt.to_response(HuntCounts::default())))
}

#[get("/{hunt_id}")]
pub async fn get_hunt(
    path: web::Path<Uuid>,
    hunt_service: web::Data<HuntService>,
) -> Result<HttpResponse, AppError> {
    let hunt = hunt_service.get_hunt(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(hunt))
}

/// Organizer edit; a capacity increase promotes from the waitlist
#[patch("/{hunt_id}")]
pub async fn update_hunt(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    request: web::Json<UpdateHuntRequest>,
    hunt_service: web::Data<HuntService>,
) -> Result<HttpResponse, AppError> {
    let hunt_id = path.into_inner();
    debug!("User {} updating hunt {}", user.user_id, hunt_id);

    let hunt = hunt_service
        .update_hunt(user.user_id, hunt_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(hunt))
}
