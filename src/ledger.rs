//! Increment ledger rules.
//!
//! An increment goes through three steps: it is proposed (a `PendingIncrement`
//! carrying the CTC snapshot and ledger version), the increment letter is
//! rendered, and only then is it committed as an `IncrementHistory` row.
//! Any failure before the commit simply drops the pending value.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    model::{
        employee::{Employee, EmployeeStatus},
        increment::{IncrementHistory, LedgerSnapshot, NewIncrement},
    },
    payroll::MAX_AMOUNT,
};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// An increment awaiting a successfully rendered increment letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingIncrement {
    pub employee_id: u64,
    /// Monthly amount.
    pub amount: Decimal,
    pub effective_date: Option<NaiveDate>,
    /// Annual CTC when the increment was proposed.
    pub old_ctc: Decimal,
    /// Ledger row count when the increment was proposed.
    pub ledger_version: u64,
}

/// Stored rows are bounded by the money columns, so the saturating folds
/// below only matter for corrupt data.
pub fn current_ctc(base_ctc: Decimal, history: &[IncrementHistory]) -> Decimal {
    base_ctc.saturating_add(cumulative_monthly_increment(history).saturating_mul(MONTHS_PER_YEAR))
}

pub fn cumulative_monthly_increment(history: &[IncrementHistory]) -> Decimal {
    history
        .iter()
        .fold(Decimal::ZERO, |acc, row| acc.saturating_add(row.increment_amount))
}

pub fn snapshot(employee: &Employee, history: &[IncrementHistory]) -> LedgerSnapshot {
    LedgerSnapshot {
        employee_id: employee.id,
        base_ctc: employee.base_ctc,
        cumulative_monthly_increment: cumulative_monthly_increment(history),
        current_ctc: current_ctc(employee.base_ctc, history),
        version: history.len() as u64,
    }
}

/// Annual CTC once a monthly increment applies. Fails when the result would
/// not fit a money column.
pub fn annual_after(old_ctc: Decimal, monthly_increment: Decimal) -> Result<Decimal, AppError> {
    monthly_increment
        .checked_mul(MONTHS_PER_YEAR)
        .and_then(|annual| old_ctc.checked_add(annual))
        .filter(|new_ctc| *new_ctc <= MAX_AMOUNT)
        .ok_or_else(|| {
            AppError::invalid(
                "increment_amount",
                format!("new CTC would exceed the maximum of {MAX_AMOUNT}"),
            )
        })
}

pub fn propose_increment(
    ledger: &LedgerSnapshot,
    amount: Decimal,
    effective_date: Option<NaiveDate>,
) -> Result<PendingIncrement, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::invalid(
            "increment_amount",
            "increment amount must be greater than zero",
        ));
    }
    annual_after(ledger.current_ctc, amount)?;

    Ok(PendingIncrement {
        employee_id: ledger.employee_id,
        amount,
        effective_date,
        old_ctc: ledger.current_ctc,
        ledger_version: ledger.version,
    })
}

/// Builds the ledger row for a pending increment. Call only after the
/// increment letter has rendered.
pub fn record_increment(
    employee: &Employee,
    pending: &PendingIncrement,
    actor: &str,
    now: NaiveDateTime,
) -> Result<NewIncrement, AppError> {
    if pending.employee_id != employee.id {
        return Err(AppError::invalid(
            "employee_id",
            format!(
                "pending increment belongs to employee {}, not {}",
                pending.employee_id, employee.id
            ),
        ));
    }

    Ok(NewIncrement {
        employee_id: employee.id,
        old_ctc: pending.old_ctc,
        increment_amount: pending.amount,
        new_ctc: annual_after(pending.old_ctc, pending.amount)?,
        effective_date: pending.effective_date,
        generated_at: now,
        generated_by: actor.to_string(),
    })
}

/// True when the ledger has moved since the increment was proposed.
pub fn is_stale(pending: &PendingIncrement, current_version: u64) -> bool {
    pending.ledger_version != current_version
}

/// New status and resignation date for a lifecycle transition.
pub fn status_change(
    employee: &Employee,
    status: EmployeeStatus,
    today: NaiveDate,
) -> (EmployeeStatus, Option<NaiveDate>) {
    let resignation_date = match status {
        EmployeeStatus::Resigned => Some(today),
        EmployeeStatus::Active => None,
        EmployeeStatus::Terminated => employee.resignation_date,
    };
    (status, resignation_date)
}
