use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed numeric or date field supplied by the user.
    #[error("invalid value for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Required wizard field absent; the client is sent back to the entry form.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unknown company '{0}'")]
    UnknownCompany(String),

    #[error("PDF conversion failed for {0}")]
    RenderFailure(String),

    #[error("upload failed: {0}")]
    UploadFailure(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("no wizard in progress for this session")]
    NoActiveWizard,

    #[error("increment ledger for employee {employee_id} changed since the increment was proposed")]
    StaleIncrement { employee_id: u64 },

    #[error("unauthorized")]
    Unauthorized,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput { .. } => "invalid_input",
            AppError::MissingField(_) => "missing_field",
            AppError::UnknownCompany(_) => "unknown_company",
            AppError::RenderFailure(_) => "render_failure",
            AppError::UploadFailure(_) => "upload_failure",
            AppError::NotFound(_) => "not_found",
            AppError::NoActiveWizard => "no_active_wizard",
            AppError::StaleIncrement { .. } => "stale_increment",
            AppError::Unauthorized => "unauthorized",
            AppError::Store(_) => "store",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnknownCompany(_) => StatusCode::NOT_FOUND,
            AppError::RenderFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::UploadFailure(_) => StatusCode::ACCEPTED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoActiveWizard => StatusCode::CONFLICT,
            AppError::StaleIncrement { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // never leak driver messages to the client
            AppError::Store(StoreError::Database(_)) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        let mut body = json!({
            "error": self.kind(),
            "message": message,
        });

        // wizard failures that route the user back to the entry point
        if matches!(self, AppError::MissingField(_) | AppError::NoActiveWizard) {
            body["redirect"] = json!("/");
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(
            AppError::invalid("ctc", "not a number").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::MissingField("document_type").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::UnknownCompany("acme".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::RenderFailure("offer_letter".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::StaleIncrement { employee_id: 3 }.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn database_errors_are_not_echoed() {
        let err = AppError::Store(StoreError::Database("secret dsn".into()));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().is_empty());
    }
}
