use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use aurora_addict_shared::{UserRole, ERROR_UNAUTHORIZED};
use futures_util::future::LocalBoxFuture;
use std::{
    collections::HashSet,
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::jwt::{Claims, JwtService};

/// Authenticated user information extracted from JWT token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        Ok(Self {
            user_id: claims.user_id()?,
            username: claims.username.clone(),
            email: claims.email.clone(),
            role: claims.role,
        })
    }

    pub fn is_admin(&self, policy: &AdminPolicy) -> bool {
        policy.allows(self)
    }
}

impl actix_web::FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let user = req
            .extensions()
            .get::<Claims>()
            .ok_or_else(|| AppError::Authentication(ERROR_UNAUTHORIZED.to_string()))
            .and_then(AuthenticatedUser::from_claims);
        ready(user)
    }
}

/// Who may call the admin endpoints: the admin role claim, or an e-mail in
/// the configured allow list
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    emails: HashSet<String>,
}

impl AdminPolicy {
    pub fn new(emails: HashSet<String>) -> Self {
        Self {
            emails: emails.into_iter().map(|email| email.to_lowercase()).collect(),
        }
    }

    pub fn allows(&self, user: &AuthenticatedUser) -> bool {
        user.role == UserRole::Admin || self.emails.contains(&user.email.to_lowercase())
    }
}

/// Validates `Authorization: Bearer <access token>` and stores the claims
/// in the request extensions.
///
/// In optional mode a request without the header passes through anonymously;
/// a header carrying a bad token is still rejected.
pub struct AuthMiddleware {
    jwt_service: Arc<JwtService>,
    required: bool,
}

impl AuthMiddleware {
    pub fn new(jwt_service: Arc<JwtService>) -> Self {
        Self {
            jwt_service,
            required: true,
        }
    }

    pub fn optional(jwt_service: Arc<JwtService>) -> Self {
        Self {
            jwt_service,
            required: false,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: self.jwt_service.clone(),
            required: self.required,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: Arc<JwtService>,
    required: bool,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt_service = self.jwt_service.clone();
        let required = self.required;

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .map(str::to_owned);

            match header {
                Some(value) => {
                    let claims = value
                        .strip_prefix("Bearer ")
                        .ok_or_else(|| AppError::Authentication("Bearer token required".to_string()))
                        .and_then(|token| jwt_service.validate_access_token(token));

                    match claims {
                        Ok(claims) => {
                            req.extensions_mut().insert(claims);
                        }
                        Err(e) => {
                            return Ok(req.into_response(e.error_response()).map_into_right_body());
                        }
                    }
                }
                None if required => {
                    let e = AppError::Authentication("Authorization token is required".to_string());
                    return Ok(req.into_response(e.error_response()).map_into_right_body());
                }
                None => {}
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
