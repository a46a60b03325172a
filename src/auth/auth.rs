use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::{auth::jwt::verify_token, config::Config, error::AppError, model::role::Role};

/// Name recorded as `generated_by` when no admin is signed in.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    fn from_bearer(req: &HttpRequest) -> Result<Self, AppError> {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let config = req
            .app_data::<Data<Config>>()
            .ok_or(AppError::Unauthorized)?;

        let claims = verify_token(token, &config.jwt_secret).map_err(|_| AppError::Unauthorized)?;
        let role = Role::from_id(claims.role).ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// `generated_by` value for an optional signed-in user.
    pub fn actor(user: Option<&AuthUser>) -> &str {
        user.map(|u| u.username.as_str()).unwrap_or(SYSTEM_ACTOR)
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already decoded by the auth middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(AuthUser::from_bearer(req))
    }
}
