use askama::Template;
use tracing::error;

use super::assembly::RenderBundle;
use crate::{error::AppError, model::document::DocumentType};

/// Turns a render bundle into HTML markup for one document kind.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: DocumentType, bundle: &RenderBundle) -> Result<String, AppError>;
}

#[derive(Template)]
#[template(path = "documents/offer_letter.html")]
struct OfferLetterTemplate<'a> {
    b: &'a RenderBundle,
}

#[derive(Template)]
#[template(path = "documents/salary_slip.html")]
struct SalarySlipTemplate<'a> {
    b: &'a RenderBundle,
}

#[derive(Template)]
#[template(path = "documents/increment_letter.html")]
struct IncrementLetterTemplate<'a> {
    b: &'a RenderBundle,
}

#[derive(Template)]
#[template(path = "documents/experience_letter.html")]
struct ExperienceLetterTemplate<'a> {
    b: &'a RenderBundle,
}

#[derive(Template)]
#[template(path = "documents/relieving_letter.html")]
struct RelievingLetterTemplate<'a> {
    b: &'a RenderBundle,
}

/// Compiled askama templates under `templates/documents/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AskamaRenderer;

impl TemplateRenderer for AskamaRenderer {
    fn render(&self, template: DocumentType, b: &RenderBundle) -> Result<String, AppError> {
        let rendered = match template.primary_part() {
            DocumentType::OfferLetter => OfferLetterTemplate { b }.render(),
            DocumentType::SalarySlip => SalarySlipTemplate { b }.render(),
            DocumentType::IncrementLetter => IncrementLetterTemplate { b }.render(),
            DocumentType::ExperienceLetter => ExperienceLetterTemplate { b }.render(),
            DocumentType::RelievingLetter => RelievingLetterTemplate { b }.render(),
            // primary_part never yields the composite type
            DocumentType::OfferAndSalary => OfferLetterTemplate { b }.render(),
        };

        rendered.map_err(|e| {
            error!(error = %e, document_type = %template, "Template rendering failed");
            AppError::RenderFailure(template.to_string())
        })
    }
}
