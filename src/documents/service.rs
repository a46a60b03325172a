//! Preview and generation.
//!
//! Generation is a small saga: assemble, render, convert, then record. Nothing
//! touches the store until the converter reports success, and an increment
//! is only written to the ledger in the same transaction as its letter.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use actix_web::web;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    assembly::{RenderBundle, assemble},
    pdf::PdfConverter,
    render::TemplateRenderer,
    upload::CloudUploader,
};
use crate::{
    error::AppError,
    ledger::{self, PendingIncrement},
    model::{
        company::CompanyDirectory,
        document::{Document, DocumentType, NewDocument},
        employee::Employee,
    },
    store::{Store, StoreError},
    wizard::{DocumentRequest, WizardEvent, WizardForm, WizardSession, WizardState},
};

/// Result of one generate request.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct GenerationOutcome {
    pub documents: Vec<Document>,
    /// Salary-slip months whose render failed; the wizard keeps only these.
    pub failed_months: Vec<String>,
    /// Zip of the salary slips produced by this request.
    pub archive: Option<String>,
    /// Non-fatal problems such as failed uploads.
    pub warnings: Vec<String>,
    /// True once every part of the flow is generated and the wizard is gone.
    pub completed: bool,
}

fn employee_not_found(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound("employee"),
        other => AppError::Store(other),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// "january" -> "January"
fn capitalized(month: &str) -> String {
    let mut chars = month.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_archive(files: &[PathBuf], destination: &Path) -> std::io::Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(destination)?);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        zip.start_file(name, options)?;
        zip.write_all(&fs::read(path)?)?;
    }
    zip.finish()?;
    Ok(())
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn Store>,
    companies: Arc<CompanyDirectory>,
    renderer: Arc<dyn TemplateRenderer>,
    converter: Arc<dyn PdfConverter>,
    uploader: Arc<dyn CloudUploader>,
    output_dir: PathBuf,
}

impl DocumentService {
    pub fn new(
        store: Arc<dyn Store>,
        companies: Arc<CompanyDirectory>,
        renderer: Arc<dyn TemplateRenderer>,
        converter: Arc<dyn PdfConverter>,
        uploader: Arc<dyn CloudUploader>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        DocumentService {
            store,
            companies,
            renderer,
            converter,
            uploader,
            output_dir: output_dir.into(),
        }
    }

    pub fn companies(&self) -> &CompanyDirectory {
        &self.companies
    }

    // ---------- starting a wizard ----------

    /// Public form submit: resolve (or create) the employee and seed the wizard.
    #[instrument(name = "wizard_submit", skip(self, form))]
    pub async fn submit_form(
        &self,
        form: &WizardForm,
        current_year: i32,
    ) -> Result<WizardSession, AppError> {
        let document_type = form.document_type()?;
        let full_name = form.full_name()?;
        let aadhar_no = form.aadhar_no();
        form.months()?;

        let employee = match self
            .store
            .find_employee_by_identity(&full_name, aadhar_no.as_deref())
            .await?
        {
            Some(existing) => {
                debug!(employee_id = existing.id, "Matched existing employee");
                existing
            }
            None => {
                let created = self.store.create_employee(form.to_new_employee()?).await?;
                info!(
                    employee_id = created.id,
                    code = %created.employee_code,
                    "Employee created from form"
                );
                created
            }
        };

        let mut state = WizardState::from_form(form, document_type, &employee, current_year)?;
        let pending = self.propose_increment(&mut state).await?;
        WizardSession::submitted(state, pending)
    }

    /// Admin flow: seed the wizard from a stored employee.
    #[instrument(name = "wizard_start", skip(self, request))]
    pub async fn start_for_employee(
        &self,
        employee_id: u64,
        document_type: DocumentType,
        request: &DocumentRequest,
        current_year: i32,
    ) -> Result<WizardSession, AppError> {
        let employee = self
            .store
            .get_employee(employee_id)
            .await
            .map_err(employee_not_found)?;

        if document_type == DocumentType::SalarySlip && request.months.is_empty() {
            return Err(AppError::MissingField("months"));
        }
        if document_type == DocumentType::IncrementLetter && request.increment_amount.is_none() {
            return Err(AppError::invalid(
                "increment_amount",
                "an increment amount is required",
            ));
        }

        let snapshot = self.store.ledger_snapshot(employee_id).await?;
        let mut state = WizardState::from_employee(
            &employee,
            document_type,
            request,
            snapshot.current_ctc,
            current_year,
        )?;
        let pending = self.propose_increment(&mut state).await?;
        WizardSession::submitted(state, pending)
    }

    /// Snapshots the ledger for an increment letter. The wizard CTC is replaced
    /// by the ledger's current CTC so the letter and the ledger agree.
    async fn propose_increment(
        &self,
        state: &mut WizardState,
    ) -> Result<Option<PendingIncrement>, AppError> {
        if state.document_type != DocumentType::IncrementLetter {
            return Ok(None);
        }

        let snapshot = self
            .store
            .ledger_snapshot(state.employee_id)
            .await
            .map_err(employee_not_found)?;
        let pending = ledger::propose_increment(
            &snapshot,
            state.monthly_increment()?,
            state.effective_date(),
        )?;
        state.ctc = Some(snapshot.current_ctc.normalize().to_string());

        debug!(
            employee_id = state.employee_id,
            amount = %pending.amount,
            ledger_version = pending.ledger_version,
            "Increment proposed"
        );
        Ok(Some(pending))
    }

    // ---------- preview ----------

    /// Render bundle for one part of the flow. Side-effect free.
    pub fn bundle(
        &self,
        state: &WizardState,
        requested: Option<DocumentType>,
    ) -> Result<(DocumentType, RenderBundle), AppError> {
        let part = state.resolve_part(requested)?;
        state.check_required(part)?;
        let breakdown = state.breakdown()?;
        let bundle = assemble(state, part, &breakdown, &self.companies)?;

        // a slip preview shows the first selected month
        let bundle = match (part, state.selected_months.first()) {
            (DocumentType::SalarySlip, Some(month)) => {
                bundle.for_month(month, state.selected_year)
            }
            _ => bundle,
        };
        Ok((part, bundle))
    }

    pub fn preview(
        &self,
        state: &WizardState,
        requested: Option<DocumentType>,
    ) -> Result<String, AppError> {
        let (part, bundle) = self.bundle(state, requested)?;
        self.renderer.render(part, &bundle)
    }

    // ---------- generate ----------

    /// Generates the requested part, or every remaining part of a composite
    /// flow when none is named. The session is updated in place; the caller
    /// stores it back, or drops it once `completed` is set.
    #[instrument(
        name = "wizard_generate",
        skip(self, session),
        fields(employee_id = session.state.employee_id, document_type = %session.state.document_type)
    )]
    pub async fn generate(
        &self,
        session: &mut WizardSession,
        requested: Option<DocumentType>,
        actor: &str,
    ) -> Result<GenerationOutcome, AppError> {
        let parts: Vec<DocumentType> = match requested {
            Some(_) => vec![session.state.resolve_part(requested)?],
            None => session
                .state
                .document_type
                .parts()
                .iter()
                .copied()
                .filter(|p| !session.generated_parts.contains(p))
                .collect(),
        };

        let mut outcome = GenerationOutcome::default();
        for part in parts {
            if let Err(err) = self.generate_part(session, part, actor, &mut outcome).await {
                session.advance(WizardEvent::GenerationFailed)?;
                return Err(err);
            }
            if !outcome.failed_months.is_empty() {
                // partial batch: keep the wizard for the failed months
                session.advance(WizardEvent::GenerationFailed)?;
                return Ok(outcome);
            }
            if !session.generated_parts.contains(&part) {
                session.generated_parts.push(part);
            }
        }

        if session.is_complete() {
            session.advance(WizardEvent::GenerationSucceeded)?;
            session.pending_increment = None;
            session.state.selected_months.clear();
            outcome.completed = true;
        } else {
            session.advance(WizardEvent::Previewed)?;
        }
        Ok(outcome)
    }

    async fn generate_part(
        &self,
        session: &mut WizardSession,
        part: DocumentType,
        actor: &str,
        outcome: &mut GenerationOutcome,
    ) -> Result<(), AppError> {
        let state = &session.state;
        state.check_required(part)?;
        // recomputed; preview results are never reused
        let breakdown = state.breakdown()?;
        let bundle = assemble(state, part, &breakdown, &self.companies)?;

        match part {
            DocumentType::SalarySlip if !state.selected_months.is_empty() => {
                self.generate_slips(session, &bundle, actor, outcome).await
            }
            DocumentType::IncrementLetter => {
                let document = self.generate_increment(session, &bundle, actor).await?;
                self.upload(&document, &session.state, outcome).await;
                outcome.documents.push(document);
                Ok(())
            }
            _ => {
                let (filename, path) = self.target(state, part, None);
                self.render_to(part, &bundle, &path).await?;
                let document = self
                    .store
                    .insert_document(self.new_document(state, part, filename, &path, None, actor))
                    .await
                    .inspect_err(|_| {
                        let _ = fs::remove_file(&path);
                    })?;
                info!(document_id = document.id, document_type = %part, "Document generated");
                self.upload(&document, state, outcome).await;
                outcome.documents.push(document);
                Ok(())
            }
        }
    }

    /// One slip per month, each recorded on its own. Months that fail are
    /// reported; the wizard is narrowed to them.
    async fn generate_slips(
        &self,
        session: &mut WizardSession,
        bundle: &RenderBundle,
        actor: &str,
        outcome: &mut GenerationOutcome,
    ) -> Result<(), AppError> {
        let state = session.state.clone();
        let mut written = Vec::new();
        let mut failed = Vec::new();

        for month in &state.selected_months {
            let month_bundle = bundle.for_month(month, state.selected_year);
            let (filename, path) = self.target(&state, DocumentType::SalarySlip, Some(month));

            if let Err(err) = self.render_to(DocumentType::SalarySlip, &month_bundle, &path).await {
                warn!(month = %month, error = %err, "Salary slip failed");
                failed.push(month.clone());
                continue;
            }

            let record = self.new_document(
                &state,
                DocumentType::SalarySlip,
                filename,
                &path,
                Some(month),
                actor,
            );
            match self.store.insert_document(record).await {
                Ok(document) => {
                    info!(document_id = document.id, month = %month, "Salary slip generated");
                    self.upload(&document, &state, outcome).await;
                    written.push(path);
                    outcome.documents.push(document);
                }
                Err(err) => {
                    error!(month = %month, error = %err, "Failed to record salary slip");
                    let _ = fs::remove_file(&path);
                    failed.push(month.clone());
                }
            }
        }

        if written.is_empty() {
            return Err(AppError::RenderFailure(format!(
                "salary_slip ({})",
                failed.join(", ")
            )));
        }

        let archive = self
            .employee_dir(&state)
            .join(format!("{}_Salary_Slips.zip", state.employee_code));
        let target = archive.clone();
        match web::block(move || write_archive(&written, &target)).await {
            Ok(Ok(())) => outcome.archive = Some(archive.display().to_string()),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to write salary slip archive");
                outcome.warnings.push(format!("archive not written: {e}"));
            }
            Err(e) => {
                warn!(error = %e, "Archive task failed");
                outcome.warnings.push(format!("archive not written: {e}"));
            }
        }

        if !failed.is_empty() {
            warn!(failed = ?failed, "Salary slip batch partially failed");
            session.state.selected_months = failed.clone();
        }
        outcome.failed_months = failed;
        Ok(())
    }

    /// Render, then commit ledger row and document together. A stale
    /// proposal removes the file and drops the pending increment.
    async fn generate_increment(
        &self,
        session: &mut WizardSession,
        bundle: &RenderBundle,
        actor: &str,
    ) -> Result<Document, AppError> {
        let pending = session
            .pending_increment
            .clone()
            .ok_or(AppError::MissingField("increment_amount"))?;
        let state = &session.state;
        let employee: Employee = self
            .store
            .get_employee(state.employee_id)
            .await
            .map_err(employee_not_found)?;

        let (filename, path) = self.target(state, DocumentType::IncrementLetter, None);
        self.render_to(DocumentType::IncrementLetter, bundle, &path).await?;

        let increment = ledger::record_increment(&employee, &pending, actor, now())?;
        let record = self.new_document(
            state,
            DocumentType::IncrementLetter,
            filename,
            &path,
            None,
            actor,
        );

        match self
            .store
            .commit_increment_letter(record, increment, pending.ledger_version)
            .await
        {
            Ok((document, history)) => {
                info!(
                    document_id = document.id,
                    increment_id = history.id,
                    new_ctc = %history.new_ctc,
                    "Increment committed"
                );
                Ok(document)
            }
            Err(StoreError::Conflict(reason)) => {
                warn!(employee_id = employee.id, reason = %reason, "Stale increment discarded");
                let _ = fs::remove_file(&path);
                session.pending_increment = None;
                Err(AppError::StaleIncrement {
                    employee_id: employee.id,
                })
            }
            Err(other) => {
                let _ = fs::remove_file(&path);
                Err(other.into())
            }
        }
    }

    // ---------- helpers ----------

    async fn render_to(
        &self,
        part: DocumentType,
        bundle: &RenderBundle,
        path: &Path,
    ) -> Result<(), AppError> {
        let markup = self.renderer.render(part, bundle)?;
        let converter = Arc::clone(&self.converter);
        let destination = path.to_path_buf();

        let converted = web::block(move || converter.convert(&markup, &destination))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "PDF conversion task failed");
                false
            });

        if converted {
            Ok(())
        } else {
            Err(AppError::RenderFailure(part.to_string()))
        }
    }

    fn employee_dir(&self, state: &WizardState) -> PathBuf {
        self.output_dir.join(state.employee_code.as_str())
    }

    fn target(
        &self,
        state: &WizardState,
        part: DocumentType,
        month: Option<&str>,
    ) -> (String, PathBuf) {
        let filename = match month {
            Some(month) => format!(
                "{part}_{}_{}.pdf",
                capitalized(month),
                state.selected_year
            ),
            // two generations within the same second must not share a file
            None => format!(
                "{part}_{}_{}.pdf",
                now().format("%Y%m%d%H%M%S"),
                &Uuid::new_v4().to_simple().to_string()[..8]
            ),
        };
        let path = self.employee_dir(state).join(&filename);
        (filename, path)
    }

    fn new_document(
        &self,
        state: &WizardState,
        part: DocumentType,
        filename: String,
        path: &Path,
        month: Option<&str>,
        actor: &str,
    ) -> NewDocument {
        NewDocument {
            employee_id: state.employee_id,
            document_type: part,
            filename,
            file_path: path.display().to_string(),
            month: month.map(str::to_lowercase),
            year: (part == DocumentType::SalarySlip).then_some(state.selected_year),
            generated_at: now(),
            generated_by: actor.to_string(),
        }
    }

    /// Best effort; a failure only adds a warning.
    async fn upload(&self, document: &Document, state: &WizardState, outcome: &mut GenerationOutcome) {
        let folder = format!("{}/{}", state.employee_code, document.document_type);
        match self
            .uploader
            .upload(Path::new(&document.file_path), &folder, state.employee_code.as_str())
            .await
        {
            Ok(remote_id) => debug!(document_id = document.id, remote_id = %remote_id, "Uploaded"),
            Err(err) => {
                warn!(document_id = document.id, error = %err, "Upload failed");
                outcome
                    .warnings
                    .push(format!("{} was saved but not uploaded: {err}", document.filename));
            }
        }
    }
}
