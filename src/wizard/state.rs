use chrono::{Month, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    ledger::PendingIncrement,
    model::{
        company::DEFAULT_COMPANY_ID,
        document::{DocumentType, RequiredField},
        employee::{BankDetails, Employee, EmployeeCode, NewEmployee},
    },
    payroll::{MAX_AMOUNT, SalaryBreakdown, compute_breakdown},
    utils::dates::parse_form_date,
};

/// Raw fields of the public document form. Nothing is parsed until preview.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WizardForm {
    #[schema(example = "offer_letter")]
    pub document_type: Option<String>,
    #[schema(example = "Asha Rao")]
    pub full_name: Option<String>,
    pub aadhar_no: Option<String>,
    pub pan_no: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    #[schema(example = "600000")]
    pub ctc: Option<String>,
    #[schema(example = "5000")]
    pub increment_amount: Option<String>,
    #[schema(example = "2024-03-18")]
    pub joining_date: Option<String>,
    pub resignation_date: Option<String>,
    pub effective_date: Option<String>,
    #[serde(default)]
    #[schema(example = json!(["january", "february"]))]
    pub months: Vec<String>,
    #[schema(example = "2024")]
    pub year: Option<String>,
    #[schema(example = "company1")]
    pub company: Option<String>,
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub branch: Option<String>,
    pub ifsc_code: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Lowercase full month names, deduplicated in the order given. Names and
/// three-letter abbreviations are accepted in any case; blanks are skipped.
/// Month names end up in file names, so anything else is rejected.
fn normalize_months(months: &[String]) -> Result<Vec<String>, AppError> {
    let mut out: Vec<String> = Vec::new();
    for raw in months {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let month = raw
            .parse::<Month>()
            .map_err(|_| AppError::invalid("months", format!("'{raw}' is not a month")))?
            .name()
            .to_lowercase();
        if !out.contains(&month) {
            out.push(month);
        }
    }
    Ok(out)
}

/// Parses a money field. Blank means zero; anything else must be a number
/// no larger than `MAX_AMOUNT`.
fn parse_amount(field: &'static str, raw: Option<&str>) -> Result<Decimal, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Decimal::ZERO);
    };
    let amount = raw
        .replace(',', "")
        .parse::<Decimal>()
        .map_err(|_| AppError::invalid(field, format!("'{raw}' is not a number")))?;
    if amount.abs() > MAX_AMOUNT {
        return Err(AppError::invalid(
            field,
            format!("{amount} exceeds the maximum of {MAX_AMOUNT}"),
        ));
    }
    Ok(amount)
}

impl WizardForm {
    pub fn document_type(&self) -> Result<DocumentType, AppError> {
        let raw = non_blank(&self.document_type).ok_or(AppError::MissingField("document_type"))?;
        raw.parse::<DocumentType>()
            .map_err(|_| AppError::invalid("document_type", format!("unknown document type '{raw}'")))
    }

    pub fn full_name(&self) -> Result<String, AppError> {
        non_blank(&self.full_name).ok_or(AppError::MissingField(RequiredField::FullName.name()))
    }

    pub fn aadhar_no(&self) -> Option<String> {
        non_blank(&self.aadhar_no)
    }

    pub fn months(&self) -> Result<Vec<String>, AppError> {
        normalize_months(&self.months)
    }

    /// Year typed on the form, or `fallback` when blank or not a number.
    pub fn year_or(&self, fallback: i32) -> i32 {
        non_blank(&self.year)
            .and_then(|y| y.parse().ok())
            .unwrap_or(fallback)
    }

    fn bank(&self) -> BankDetails {
        BankDetails {
            account_holder: non_blank(&self.account_holder),
            account_number: non_blank(&self.account_number),
            bank_name: non_blank(&self.bank_name),
            branch: non_blank(&self.branch),
            ifsc_code: non_blank(&self.ifsc_code),
        }
    }

    /// Employee record created when the form names someone not on file.
    pub fn to_new_employee(&self) -> Result<NewEmployee, AppError> {
        let mut new = NewEmployee::named(self.full_name()?);
        new.aadhar_no = self.aadhar_no();
        new.pan_no = non_blank(&self.pan_no);
        new.email = non_blank(&self.email);
        new.phone = non_blank(&self.phone);
        new.address = non_blank(&self.address);
        new.designation = non_blank(&self.designation);
        new.department = non_blank(&self.department);
        new.base_ctc = parse_amount("ctc", self.ctc.as_deref())?;
        new.joining_date = parse_form_date(self.joining_date.as_deref());
        new.resignation_date = parse_form_date(self.resignation_date.as_deref());
        new.bank = self.bank();
        Ok(new)
    }
}

/// Everything the wizard carries between submit, preview and generate.
///
/// Dates and amounts stay as the strings the user typed; they are parsed on
/// every preview and again on generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub document_type: DocumentType,
    pub employee_id: u64,
    pub employee_code: EmployeeCode,
    pub full_name: String,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub aadhar_no: Option<String>,
    pub pan_no: Option<String>,
    pub ctc: Option<String>,
    pub increment_amount: Option<String>,
    pub joining_date: Option<String>,
    pub resignation_date: Option<String>,
    pub effective_date: Option<String>,
    pub selected_months: Vec<String>,
    /// Resolved once at submit so previews do not depend on the clock.
    pub selected_year: i32,
    pub company: String,
    pub bank: BankDetails,
}

/// Body of the admin-initiated document flow.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DocumentRequest {
    #[serde(default)]
    #[schema(example = json!(["january"]))]
    pub months: Vec<String>,
    #[schema(example = 2024)]
    pub year: Option<i32>,
    #[schema(example = "company1")]
    pub company: Option<String>,
    /// Monthly amount; required for increment letters.
    #[schema(value_type = Option<String>, example = "5000")]
    pub increment_amount: Option<Decimal>,
    #[schema(value_type = Option<String>, format = "date")]
    pub effective_date: Option<NaiveDate>,
}

fn date_string(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

impl WizardState {
    /// Wizard seeded from the public form for an already resolved employee.
    pub fn from_form(
        form: &WizardForm,
        document_type: DocumentType,
        employee: &Employee,
        current_year: i32,
    ) -> Result<Self, AppError> {
        Ok(WizardState {
            document_type,
            employee_id: employee.id,
            employee_code: employee.employee_code.clone(),
            full_name: form.full_name()?,
            designation: non_blank(&form.designation).or_else(|| employee.designation.clone()),
            department: non_blank(&form.department).or_else(|| employee.department.clone()),
            address: non_blank(&form.address).or_else(|| employee.address.clone()),
            email: non_blank(&form.email).or_else(|| employee.email.clone()),
            phone: non_blank(&form.phone).or_else(|| employee.phone.clone()),
            aadhar_no: form.aadhar_no().or_else(|| employee.aadhar_no.clone()),
            pan_no: non_blank(&form.pan_no).or_else(|| employee.pan_no.clone()),
            ctc: non_blank(&form.ctc),
            increment_amount: non_blank(&form.increment_amount),
            joining_date: non_blank(&form.joining_date),
            resignation_date: non_blank(&form.resignation_date),
            effective_date: non_blank(&form.effective_date),
            selected_months: form.months()?,
            selected_year: form.year_or(current_year),
            company: non_blank(&form.company).unwrap_or_else(|| DEFAULT_COMPANY_ID.to_string()),
            bank: form.bank(),
        })
    }

    /// Wizard seeded from a stored employee. `current_ctc` comes from the ledger.
    pub fn from_employee(
        employee: &Employee,
        document_type: DocumentType,
        request: &DocumentRequest,
        current_ctc: Decimal,
        current_year: i32,
    ) -> Result<Self, AppError> {
        Ok(WizardState {
            document_type,
            employee_id: employee.id,
            employee_code: employee.employee_code.clone(),
            full_name: employee.full_name.clone(),
            designation: employee.designation.clone(),
            department: employee.department.clone(),
            address: employee.address.clone(),
            email: employee.email.clone(),
            phone: employee.phone.clone(),
            aadhar_no: employee.aadhar_no.clone(),
            pan_no: employee.pan_no.clone(),
            ctc: Some(current_ctc.normalize().to_string()),
            increment_amount: request.increment_amount.map(|a| a.normalize().to_string()),
            joining_date: date_string(employee.joining_date),
            resignation_date: date_string(employee.resignation_date),
            effective_date: date_string(request.effective_date),
            selected_months: normalize_months(&request.months)?,
            selected_year: request.year.unwrap_or(current_year),
            company: request
                .company
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_COMPANY_ID)
                .to_string(),
            bank: employee.bank.clone(),
        })
    }

    pub fn ctc(&self) -> Result<Decimal, AppError> {
        parse_amount("ctc", self.ctc.as_deref())
    }

    pub fn monthly_increment(&self) -> Result<Decimal, AppError> {
        parse_amount("increment_amount", self.increment_amount.as_deref())
    }

    pub fn joining_date(&self) -> Option<NaiveDate> {
        parse_form_date(self.joining_date.as_deref())
    }

    pub fn resignation_date(&self) -> Option<NaiveDate> {
        parse_form_date(self.resignation_date.as_deref())
    }

    pub fn effective_date(&self) -> Option<NaiveDate> {
        parse_form_date(self.effective_date.as_deref())
    }

    /// Recomputed on every call; cached previews are never trusted.
    pub fn breakdown(&self) -> Result<SalaryBreakdown, AppError> {
        let breakdown = compute_breakdown(self.ctc()?, self.monthly_increment()?)?;
        if breakdown.special_allowance.is_sign_negative() {
            debug!(
                employee_id = self.employee_id,
                special_allowance = %breakdown.special_allowance,
                "Special allowance is negative"
            );
        }
        Ok(breakdown)
    }

    /// Maps an optional sub-document name onto a part of this flow.
    pub fn resolve_part(&self, requested: Option<DocumentType>) -> Result<DocumentType, AppError> {
        match requested {
            None => Ok(self.document_type.primary_part()),
            Some(part) if part == self.document_type => Ok(part.primary_part()),
            Some(part) if self.document_type.parts().contains(&part) => Ok(part),
            Some(part) => Err(AppError::invalid(
                "document_type",
                format!("{part} is not part of the {} flow", self.document_type),
            )),
        }
    }

    pub fn check_required(&self, part: DocumentType) -> Result<(), AppError> {
        for field in part.required_fields() {
            let present = match field {
                RequiredField::FullName => !self.full_name.trim().is_empty(),
                RequiredField::Designation => self.designation.is_some(),
                RequiredField::JoiningDate => self.joining_date().is_some(),
                RequiredField::ResignationDate => self.resignation_date().is_some(),
            };
            if !present {
                return Err(AppError::MissingField(field.name()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    Collecting,
    Previewing,
    Generated,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEvent {
    Submitted,
    Previewed,
    GenerationSucceeded,
    GenerationFailed,
    Abandoned,
}

impl WizardStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, WizardStage::Generated | WizardStage::Abandoned)
    }

    pub fn apply(self, event: WizardEvent) -> Result<WizardStage, AppError> {
        use WizardEvent as E;
        use WizardStage as S;

        match (self, event) {
            (S::Collecting | S::Previewing, E::Submitted) => Ok(S::Previewing),
            (S::Previewing, E::Previewed | E::GenerationFailed) => Ok(S::Previewing),
            (S::Previewing, E::GenerationSucceeded) => Ok(S::Generated),
            (S::Collecting | S::Previewing, E::Abandoned) => Ok(S::Abandoned),
            _ => Err(AppError::NoActiveWizard),
        }
    }
}

/// A wizard in flight, keyed by session id in the wizard store.
#[derive(Debug, Clone)]
pub struct WizardSession {
    pub state: WizardState,
    pub stage: WizardStage,
    /// Set for increment letters until the letter is committed.
    pub pending_increment: Option<PendingIncrement>,
    /// Sub-documents of a composite flow already generated.
    pub generated_parts: Vec<DocumentType>,
}

impl WizardSession {
    /// Applies the submit transition to a fresh wizard.
    pub fn submitted(
        state: WizardState,
        pending_increment: Option<PendingIncrement>,
    ) -> Result<Self, AppError> {
        Ok(WizardSession {
            state,
            stage: WizardStage::Collecting.apply(WizardEvent::Submitted)?,
            pending_increment,
            generated_parts: Vec::new(),
        })
    }

    pub fn advance(&mut self, event: WizardEvent) -> Result<(), AppError> {
        self.stage = self.stage.apply(event)?;
        Ok(())
    }

    /// Whether every part of the flow has been generated.
    pub fn is_complete(&self) -> bool {
        self.state
            .document_type
            .parts()
            .iter()
            .all(|part| self.generated_parts.contains(part))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::model::employee::EmployeeStatus;

    fn employee() -> Employee {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Employee {
            id: 4,
            employee_code: EmployeeCode::from_row_id(4),
            full_name: "Asha Rao".into(),
            email: None,
            phone: None,
            address: Some("12 MG Road".into()),
            aadhar_no: Some("123412341234".into()),
            pan_no: None,
            designation: Some("Engineer".into()),
            department: None,
            base_ctc: dec!(600000),
            joining_date: NaiveDate::from_ymd_opt(2024, 3, 18),
            resignation_date: None,
            status: EmployeeStatus::Active,
            bank: BankDetails::default(),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn form(document_type: &str) -> WizardForm {
        WizardForm {
            document_type: Some(document_type.into()),
            full_name: Some("  Asha Rao ".into()),
            ctc: Some("600000".into()),
            months: vec!["January".into(), " february".into(), "january".into()],
            ..Default::default()
        }
    }

    #[test]
    fn document_type_is_required_and_closed() {
        let mut f = form("offer_letter");
        f.document_type = Some("  ".into());
        assert!(matches!(
            f.document_type(),
            Err(AppError::MissingField("document_type"))
        ));

        f.document_type = Some("payslip".into());
        assert!(matches!(
            f.document_type(),
            Err(AppError::InvalidInput { field: "document_type", .. })
        ));
    }

    #[test]
    fn form_state_keeps_raw_strings_and_defaults() {
        let f = form("salary_slip");
        let state = WizardState::from_form(&f, DocumentType::SalarySlip, &employee(), 2024).unwrap();

        assert_eq!(state.full_name, "Asha Rao");
        assert_eq!(state.selected_months, vec!["january", "february"]);
        assert_eq!(state.selected_year, 2024);
        assert_eq!(state.company, DEFAULT_COMPANY_ID);
        // designation falls back to the employee record
        assert_eq!(state.designation.as_deref(), Some("Engineer"));
        assert_eq!(state.breakdown().unwrap().net_salary, dec!(49800));
    }

    #[test]
    fn malformed_amount_is_invalid_input() {
        let mut f = form("salary_slip");
        f.ctc = Some("six lakh".into());
        let state = WizardState::from_form(&f, DocumentType::SalarySlip, &employee(), 2024).unwrap();
        assert!(matches!(
            state.breakdown(),
            Err(AppError::InvalidInput { field: "ctc", .. })
        ));
    }

    #[test]
    fn amounts_past_the_maximum_are_invalid_input() {
        let mut f = form("salary_slip");
        f.ctc = Some("79228162514264337593543950335".into());
        assert!(matches!(
            f.to_new_employee(),
            Err(AppError::InvalidInput { field: "ctc", .. })
        ));

        let mut state = WizardState::from_form(
            &form("increment_letter"),
            DocumentType::IncrementLetter,
            &employee(),
            2024,
        )
        .unwrap();
        state.increment_amount = Some("1,000,000,000,000".into());
        assert!(matches!(
            state.breakdown(),
            Err(AppError::InvalidInput { field: "increment_amount", .. })
        ));
        state.increment_amount = Some("999,999,999,999".into());
        assert!(state.breakdown().is_ok());
    }

    #[test]
    fn months_accept_names_and_abbreviations() {
        let mut f = form("salary_slip");
        f.months = vec!["MAR".into(), "march".into(), " ".into(), "Sep".into()];
        let state = WizardState::from_form(&f, DocumentType::SalarySlip, &employee(), 2024).unwrap();
        assert_eq!(state.selected_months, vec!["march", "september"]);
    }

    #[test]
    fn unknown_months_are_rejected() {
        for bad in ["foo", "../../../../tmp/x", "janu/ary", "13"] {
            let mut f = form("salary_slip");
            f.months = vec!["january".into(), bad.into()];
            assert!(
                matches!(
                    WizardState::from_form(&f, DocumentType::SalarySlip, &employee(), 2024),
                    Err(AppError::InvalidInput { field: "months", .. })
                ),
                "{bad} was accepted"
            );

            let request = DocumentRequest {
                months: vec![bad.into()],
                ..Default::default()
            };
            assert!(WizardState::from_employee(
                &employee(),
                DocumentType::SalarySlip,
                &request,
                dec!(600000),
                2024
            )
            .is_err());
        }
    }

    #[test]
    fn sub_documents_resolve_within_the_flow() {
        let state = WizardState::from_form(
            &form("offer_and_salary"),
            DocumentType::OfferAndSalary,
            &employee(),
            2024,
        )
        .unwrap();

        assert_eq!(state.resolve_part(None).unwrap(), DocumentType::OfferLetter);
        assert_eq!(
            state.resolve_part(Some(DocumentType::SalarySlip)).unwrap(),
            DocumentType::SalarySlip
        );
        assert!(state.resolve_part(Some(DocumentType::RelievingLetter)).is_err());
    }

    #[test]
    fn relieving_letter_needs_a_resignation_date() {
        let request = DocumentRequest::default();
        let state = WizardState::from_employee(
            &employee(),
            DocumentType::RelievingLetter,
            &request,
            dec!(600000),
            2024,
        )
        .unwrap();
        assert!(matches!(
            state.check_required(DocumentType::RelievingLetter),
            Err(AppError::MissingField("resignation_date"))
        ));
        assert!(state.check_required(DocumentType::ExperienceLetter).is_ok());
    }

    #[test]
    fn stage_transitions() {
        use WizardEvent as E;
        use WizardStage as S;

        assert_eq!(S::Collecting.apply(E::Submitted).unwrap(), S::Previewing);
        assert_eq!(S::Previewing.apply(E::Previewed).unwrap(), S::Previewing);
        assert_eq!(S::Previewing.apply(E::GenerationFailed).unwrap(), S::Previewing);
        assert_eq!(S::Previewing.apply(E::GenerationSucceeded).unwrap(), S::Generated);
        assert_eq!(S::Previewing.apply(E::Abandoned).unwrap(), S::Abandoned);

        assert!(S::Collecting.apply(E::GenerationSucceeded).is_err());
        assert!(S::Generated.apply(E::Previewed).is_err());
        assert!(S::Abandoned.apply(E::Submitted).is_err());
        assert!(S::Generated.is_terminal());
    }

    #[test]
    fn composite_flow_completes_after_every_part() {
        let state = WizardState::from_form(
            &form("offer_and_salary"),
            DocumentType::OfferAndSalary,
            &employee(),
            2024,
        )
        .unwrap();
        let mut session = WizardSession::submitted(state, None).unwrap();
        assert_eq!(session.stage, WizardStage::Previewing);

        session.generated_parts.push(DocumentType::OfferLetter);
        assert!(!session.is_complete());
        session.generated_parts.push(DocumentType::SalarySlip);
        assert!(session.is_complete());
    }
}
