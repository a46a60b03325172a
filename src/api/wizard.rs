use actix_web::{
    HttpRequest, HttpResponse,
    cookie::Cookie,
    http::StatusCode,
    web,
};
use chrono::{Datelike, Local};
use serde::Serialize;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::auth::AuthUser,
    documents::{GenerationOutcome, RenderBundle},
    error::AppError,
    model::document::DocumentType,
    state::AppState,
    wizard::{SESSION_COOKIE, WizardEvent, WizardForm, WizardSession, WizardStage, session_id},
};

#[derive(Serialize, ToSchema)]
pub struct WizardStarted {
    #[schema(example = "6f1c2c1e-2a7e-4d8e-9d61-1f0a7c0d7f1b")]
    pub session: String,
    pub document_type: DocumentType,
    /// Sub-documents that can be previewed and generated by name.
    pub parts: Vec<DocumentType>,
    pub employee_id: u64,
    #[schema(example = "EMP0001")]
    pub employee_code: String,
    pub stage: WizardStage,
}

#[derive(Serialize, ToSchema)]
pub struct BundleResponse {
    pub document_type: DocumentType,
    #[schema(value_type = Object)]
    pub bundle: RenderBundle,
}

/// Stores a fresh wizard and hands the session id back as a cookie.
pub(crate) async fn open_session(
    state: &AppState,
    req: &HttpRequest,
    wizard: WizardSession,
) -> HttpResponse {
    // resubmitting from the same browser replaces the previous wizard
    let session = session_id(req).unwrap_or_else(Uuid::new_v4);
    let body = WizardStarted {
        session: session.to_string(),
        document_type: wizard.state.document_type,
        parts: wizard.state.document_type.parts().to_vec(),
        employee_id: wizard.state.employee_id,
        employee_code: wizard.state.employee_code.to_string(),
        stage: wizard.stage,
    };
    state.wizards.put(session, wizard).await;

    let cookie = Cookie::build(SESSION_COOKIE, session.to_string())
        .path("/")
        .http_only(true)
        .finish();
    HttpResponse::Created().cookie(cookie).json(body)
}

/// Submit the document form
#[utoipa::path(
    post,
    path = "/wizard",
    request_body = WizardForm,
    responses(
        (status = 201, description = "Wizard started", body = WizardStarted),
        (status = 400, description = "Malformed field"),
        (status = 422, description = "Missing document type or name; redirect to the form")
    ),
    tag = "Wizard"
)]
pub async fn submit(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Json<WizardForm>,
) -> actix_web::Result<HttpResponse> {
    let wizard = state
        .documents
        .submit_form(&form, Local::now().year())
        .await?;
    Ok(open_session(&state, &req, wizard).await)
}

async fn render_preview(
    req: &HttpRequest,
    state: &AppState,
    part: Option<DocumentType>,
) -> Result<HttpResponse, AppError> {
    let (session, wizard) = state.wizards.require(session_id(req)).await?;
    wizard.stage.apply(WizardEvent::Previewed)?;

    let html = state.documents.preview(&wizard.state, part)?;
    debug!(session = %session, part = ?part, "Preview rendered");
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

/// Preview the selected document
#[utoipa::path(
    get,
    path = "/wizard/preview",
    responses(
        (status = 200, description = "HTML preview", content_type = "text/html"),
        (status = 409, description = "No wizard in progress")
    ),
    tag = "Wizard"
)]
pub async fn preview(req: HttpRequest, state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    Ok(render_preview(&req, &state, None).await?)
}

/// Preview one sub-document of the flow
#[utoipa::path(
    get,
    path = "/wizard/preview/{doc_type}",
    params(("doc_type" = DocumentType, Path, description = "Sub-document to preview")),
    responses(
        (status = 200, description = "HTML preview", content_type = "text/html"),
        (status = 400, description = "Not part of this flow"),
        (status = 409, description = "No wizard in progress")
    ),
    tag = "Wizard"
)]
pub async fn preview_part(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<DocumentType>,
) -> actix_web::Result<HttpResponse> {
    Ok(render_preview(&req, &state, Some(path.into_inner())).await?)
}

async fn bundle_json(
    req: &HttpRequest,
    state: &AppState,
    part: Option<DocumentType>,
) -> Result<HttpResponse, AppError> {
    let (_, wizard) = state.wizards.require(session_id(req)).await?;
    let (document_type, bundle) = state.documents.bundle(&wizard.state, part)?;
    Ok(HttpResponse::Ok().json(BundleResponse {
        document_type,
        bundle,
    }))
}

/// Render data for the selected document
#[utoipa::path(
    get,
    path = "/wizard/bundle",
    responses(
        (status = 200, description = "Render bundle", body = BundleResponse),
        (status = 409, description = "No wizard in progress")
    ),
    tag = "Wizard"
)]
pub async fn bundle(req: HttpRequest, state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    Ok(bundle_json(&req, &state, None).await?)
}

/// Render data for one sub-document
#[utoipa::path(
    get,
    path = "/wizard/bundle/{doc_type}",
    params(("doc_type" = DocumentType, Path, description = "Sub-document")),
    responses(
        (status = 200, description = "Render bundle", body = BundleResponse),
        (status = 409, description = "No wizard in progress")
    ),
    tag = "Wizard"
)]
pub async fn bundle_part(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<DocumentType>,
) -> actix_web::Result<HttpResponse> {
    Ok(bundle_json(&req, &state, Some(path.into_inner())).await?)
}

#[instrument(name = "wizard_generate_request", skip(req, state, user))]
async fn run_generate(
    req: &HttpRequest,
    state: &AppState,
    user: Option<AuthUser>,
    part: Option<DocumentType>,
) -> Result<HttpResponse, AppError> {
    let (session, mut wizard) = state.wizards.require(session_id(req)).await?;
    let actor = AuthUser::actor(user.as_ref()).to_string();

    let result = state.documents.generate(&mut wizard, part, &actor).await;

    match &result {
        Ok(outcome) if outcome.completed => {
            state.wizards.remove(&session).await;
            info!(session = %session, "Wizard completed");
        }
        // failures keep the wizard so the user can retry
        _ => state.wizards.put(session, wizard).await,
    }

    let outcome: GenerationOutcome = result?;
    let status = if outcome.failed_months.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok(HttpResponse::build(status).json(outcome))
}

/// Generate the selected document
#[utoipa::path(
    post,
    path = "/wizard/generate",
    responses(
        (status = 200, description = "Documents generated", body = GenerationOutcome),
        (status = 207, description = "Some salary-slip months failed", body = GenerationOutcome),
        (status = 409, description = "No wizard in progress, or stale increment"),
        (status = 422, description = "Missing required field"),
        (status = 502, description = "PDF conversion failed; wizard kept for retry")
    ),
    tag = "Wizard"
)]
pub async fn generate(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: Option<AuthUser>,
) -> actix_web::Result<HttpResponse> {
    Ok(run_generate(&req, &state, user, None).await?)
}

/// Generate one sub-document of the flow
#[utoipa::path(
    post,
    path = "/wizard/generate/{doc_type}",
    params(("doc_type" = DocumentType, Path, description = "Sub-document to generate")),
    responses(
        (status = 200, description = "Document generated", body = GenerationOutcome),
        (status = 409, description = "No wizard in progress"),
        (status = 502, description = "PDF conversion failed; wizard kept for retry")
    ),
    tag = "Wizard"
)]
pub async fn generate_part(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    path: web::Path<DocumentType>,
) -> actix_web::Result<HttpResponse> {
    Ok(run_generate(&req, &state, user, Some(path.into_inner())).await?)
}

/// Abandon the wizard
#[utoipa::path(
    delete,
    path = "/wizard",
    responses((status = 204, description = "Wizard dropped")),
    tag = "Wizard"
)]
pub async fn abandon(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(session) = session_id(&req) {
        if let Some(mut wizard) = state.wizards.remove(&session).await {
            if wizard.advance(WizardEvent::Abandoned).is_ok() {
                info!(
                    session = %session,
                    pending_increment = wizard.pending_increment.is_some(),
                    "Wizard abandoned"
                );
            }
        }
    }

    let expired = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    let mut resp = HttpResponse::NoContent().finish();
    let _ = resp.add_removal_cookie(&expired);
    resp
}
