//! Turns wizard state into the flat key/value bundle templates render from.
//!
//! Assembly is a pure function of its inputs: the year comes from the wizard
//! (fixed at submit) and nothing reads the clock, so repeated previews of an
//! unchanged wizard produce identical bundles.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::AppError,
    ledger,
    model::{company::CompanyDirectory, document::DocumentType},
    payroll::SalaryBreakdown,
    utils::dates::{format_display_date, month_label, previous_workday, relieving_date},
    wizard::WizardState,
};

/// Workdays between the offer date and the joining date.
pub const OFFER_LEAD_WORKDAYS: u32 = 8;

/// Render-ready data for one document. Keys are sorted, missing values are
/// left out rather than blanked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenderBundle(BTreeMap<String, String>);

impl RenderBundle {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key`, or an empty string.
    pub fn text(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    fn set_opt(&mut self, key: &str, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    fn set_money(&mut self, key: &str, value: Decimal) {
        self.set(key, money(value));
    }

    /// Copy of this bundle for the salary slip of a single month.
    pub fn for_month(&self, month: &str, year: i32) -> RenderBundle {
        let mut bundle = self.clone();
        bundle.set("month", month.to_lowercase());
        bundle.set("month_label", month_label(month, year));
        bundle
    }
}

fn money(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn assemble(
    state: &WizardState,
    part: DocumentType,
    breakdown: &SalaryBreakdown,
    companies: &CompanyDirectory,
) -> Result<RenderBundle, AppError> {
    let company = companies.resolve(&state.company)?;
    let mut b = RenderBundle::default();

    b.set("document_type", part.as_ref());
    b.set("document_title", part.title());

    b.set("company_id", company.id.as_str());
    b.set("company_name", company.display_name.as_str());
    b.set("letterhead", company.letterhead_asset.as_str());
    b.set("watermark", company.watermark());

    b.set("employee_code", state.employee_code.as_str());
    b.set("full_name", state.full_name.as_str());
    b.set_opt("designation", state.designation.clone());
    b.set_opt("department", state.department.clone());
    b.set_opt("address", state.address.clone());
    b.set_opt("email", state.email.clone());
    b.set_opt("phone", state.phone.clone());
    b.set_opt("aadhar_no", state.aadhar_no.clone());
    b.set_opt("pan_no", state.pan_no.clone());

    b.set_opt("account_holder", state.bank.account_holder.clone());
    b.set_opt("account_number", state.bank.account_number.clone());
    b.set_opt("bank_name", state.bank.bank_name.clone());
    b.set_opt("branch", state.bank.branch.clone());
    b.set_opt("ifsc_code", state.bank.ifsc_code.clone());

    if let Some(joining) = state.joining_date() {
        b.set("joining_date", format_display_date(joining));
        b.set_opt(
            "date_before",
            previous_workday(joining, OFFER_LEAD_WORKDAYS).map(format_display_date),
        );
    }
    if let Some(resigned) = state.resignation_date() {
        b.set("resignation_date", format_display_date(resigned));
        b.set_opt("relieving_date", relieving_date(resigned).map(format_display_date));
    }

    let ctc = state.ctc()?;
    b.set_money("ctc", ctc);
    b.set_money("monthly_ctc", breakdown.monthly_ctc);
    b.set_money("increment_per_month", breakdown.increment_per_month);
    b.set_money("monthly_total", breakdown.monthly_total);
    b.set_money("basic", breakdown.basic);
    b.set_money("hra", breakdown.hra);
    b.set_money("conveyance", breakdown.conveyance);
    b.set_money("medical", breakdown.medical);
    b.set_money("telephone", breakdown.telephone);
    b.set_money("special_allowance", breakdown.special_allowance);
    b.set_money("professional_tax", breakdown.professional_tax);
    b.set_money("gross_salary", breakdown.gross_salary);
    b.set_money("net_salary", breakdown.net_salary);

    if part == DocumentType::IncrementLetter {
        let increment = state.monthly_increment()?;
        b.set_money("increment_amount", increment);
        b.set_money("old_ctc", ctc);
        b.set_money("new_ctc", ledger::annual_after(ctc, increment)?);
        if let Some(effective) = state.effective_date() {
            b.set("effective_date", format_display_date(effective));
        }
    }

    if state.document_type.uses_months() {
        b.set("year", state.selected_year.to_string());
        if !state.selected_months.is_empty() {
            let labels: Vec<String> = state
                .selected_months
                .iter()
                .map(|m| month_label(m, state.selected_year))
                .collect();
            b.set("month_labels", labels.join(", "));
        }
    }

    Ok(b)
}
