use actix_web::{HttpResponse, web};
use chrono::Local;
use tracing::info;

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    state::AppState,
    store::StoreError,
};

#[utoipa::path(
    get,
    path = "/api/payments",
    responses(
        (status = 200, description = "Payments with employee and document", body = [crate::model::payment::PaymentView])
    ),
    tag = "Payment",
    security(("bearer_auth" = []))
)]
pub async fn list_payments(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let payments = state.store.list_payments().await.map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(payments))
}

#[utoipa::path(
    put,
    path = "/api/payments/{payment_id}/paid",
    params(("payment_id", Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment marked paid today", body = crate::model::payment::Payment),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payment",
    security(("bearer_auth" = []))
)]
pub async fn mark_paid(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let payment_id = path.into_inner();

    let payment = state
        .store
        .mark_payment_paid(payment_id, Local::now().date_naive())
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("payment"),
            other => other.into(),
        })?;
    info!(payment_id, admin = %auth.username, "Payment marked paid");

    Ok(HttpResponse::Ok().json(payment))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Headcount, documents and payment totals", body = crate::model::payment::DashboardStats)
    ),
    tag = "Payment",
    security(("bearer_auth" = []))
)]
pub async fn dashboard(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let stats = state.store.dashboard_stats().await.map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(stats))
}
