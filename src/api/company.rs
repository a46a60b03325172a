use actix_web::{HttpResponse, web};

use crate::{auth::auth::AuthUser, state::AppState};

#[utoipa::path(
    get,
    path = "/api/companies",
    responses((status = 200, description = "Configured companies", body = [crate::model::company::Company])),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn list_companies(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    Ok(HttpResponse::Ok().json(state.documents.companies().all()))
}
