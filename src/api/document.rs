use std::path::PathBuf;

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use chrono::{Datelike, Local};
use tracing::{error, info};

use crate::{
    api::wizard::open_session,
    auth::auth::AuthUser,
    error::AppError,
    model::document::DocumentType,
    state::AppState,
    store::StoreError,
    wizard::DocumentRequest,
};

/// Start a document wizard for a stored employee
#[utoipa::path(
    post,
    path = "/api/employees/{id}/documents/{doc_type}",
    params(
        ("id", description = "Employee ID"),
        ("doc_type" = DocumentType, Path, description = "Document to produce")
    ),
    request_body = DocumentRequest,
    responses(
        (status = 201, description = "Wizard started; continue under /wizard", body = crate::api::wizard::WizardStarted),
        (status = 400, description = "Invalid increment amount"),
        (status = 404, description = "Employee not found"),
        (status = 422, description = "Salary slips need at least one month")
    ),
    tag = "Document",
    security(("bearer_auth" = []))
)]
pub async fn start_document(
    req: HttpRequest,
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(u64, DocumentType)>,
    payload: web::Json<DocumentRequest>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (employee_id, document_type) = path.into_inner();

    let wizard = state
        .documents
        .start_for_employee(employee_id, document_type, &payload, Local::now().year())
        .await?;
    info!(
        employee_id,
        document_type = %document_type,
        admin = %auth.username,
        "Admin started document wizard"
    );

    Ok(open_session(&state, &req, wizard).await)
}

/// List an employee's documents
#[utoipa::path(
    get,
    path = "/api/employees/{id}/documents",
    params(("id", description = "Employee ID")),
    responses(
        (status = 200, description = "Documents, newest first", body = [crate::model::document::Document])
    ),
    tag = "Document",
    security(("bearer_auth" = []))
)]
pub async fn list_documents(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let documents = state
        .store
        .list_documents(path.into_inner())
        .await
        .map_err(AppError::from)?;
    Ok(HttpResponse::Ok().json(documents))
}

/// Download a generated PDF
#[utoipa::path(
    get,
    path = "/api/documents/{id}/download",
    params(("id", description = "Document ID")),
    responses(
        (status = 200, description = "PDF file", content_type = "application/pdf"),
        (status = 404, description = "Unknown document or file missing on disk")
    ),
    tag = "Document",
    security(("bearer_auth" = []))
)]
pub async fn download(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let document = state
        .store
        .get_document(path.into_inner())
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("document"),
            other => other.into(),
        })?;

    let file = PathBuf::from(&document.file_path);
    let bytes = web::block(move || std::fs::read(file))
        .await?
        .map_err(|e| {
            error!(error = %e, document_id = document.id, "Stored document unreadable");
            AppError::NotFound("document file")
        })?;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.filename),
        ))
        .body(bytes))
}
