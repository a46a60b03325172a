use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::role::Role,
    models::{LoginReqDto, LoginResponse, SetupReqDto},
    state::AppState,
    store::StoreError,
};

/// Create the first admin account
#[utoipa::path(
    post,
    path = "/auth/setup",
    request_body = SetupReqDto,
    responses(
        (status = 201, description = "Admin created", body = Object, example = json!({
            "message": "Admin created", "username": "admin"
        })),
        (status = 400, description = "Empty username or password"),
        (status = 409, description = "An admin already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_setup", skip(state, payload), fields(username = %payload.username))]
pub async fn setup(
    state: web::Data<AppState>,
    payload: web::Json<SetupReqDto>,
) -> actix_web::Result<HttpResponse> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::invalid("username", "username and password must not be empty").into());
    }

    if state.store.count_admins().await.map_err(AppError::from)? > 0 {
        info!("Setup refused: admin already exists");
        return Err(AppError::Store(StoreError::Conflict("an admin already exists".into())).into());
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        actix_web::error::ErrorInternalServerError("Failed to create admin")
    })?;

    let admin = state
        .store
        .create_admin(username, &hashed, Role::Admin.id())
        .await
        .map_err(AppError::from)?;
    info!(admin_id = admin.id, "Admin created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Admin created",
        "username": admin.username,
    })))
}

/// Admin login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::invalid("username", "username or password required").into());
    }

    let admin = match state.store.find_admin(user.username.trim()).await {
        Ok(Some(admin)) => {
            debug!(admin_id = admin.id, "Admin found");
            admin
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return Err(AppError::Unauthorized.into());
        }
        Err(e) => {
            error!(error = %e, "Store error while fetching admin");
            return Err(AppError::from(e).into());
        }
    };

    if let Err(e) = verify_password(&user.password, &admin.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized.into());
    }

    let access_token = generate_access_token(
        admin.id,
        admin.username.clone(),
        admin.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        actix_web::error::ErrorInternalServerError("Failed to issue token")
    })?;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: config.access_token_ttl,
    }))
}
