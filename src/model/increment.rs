use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Immutable ledger row, written once the increment letter has been produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct IncrementHistory {
    pub id: u64,
    pub employee_id: u64,
    /// Annual CTC snapshot taken when the increment was proposed.
    #[schema(value_type = String, example = "600000")]
    pub old_ctc: Decimal,
    /// Monthly increment amount.
    #[schema(value_type = String, example = "5000")]
    pub increment_amount: Decimal,
    #[schema(value_type = String, example = "660000")]
    pub new_ctc: Decimal,
    #[schema(value_type = Option<String>, format = "date")]
    pub effective_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date-time")]
    pub generated_at: NaiveDateTime,
    pub generated_by: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIncrement {
    pub employee_id: u64,
    pub old_ctc: Decimal,
    pub increment_amount: Decimal,
    pub new_ctc: Decimal,
    pub effective_date: Option<NaiveDate>,
    pub generated_at: NaiveDateTime,
    pub generated_by: String,
}

impl NewIncrement {
    /// The ledger row as stored under `id`.
    pub fn stored(self, id: u64) -> IncrementHistory {
        IncrementHistory {
            id,
            employee_id: self.employee_id,
            old_ctc: self.old_ctc,
            increment_amount: self.increment_amount,
            new_ctc: self.new_ctc,
            effective_date: self.effective_date,
            generated_at: self.generated_at,
            generated_by: self.generated_by,
        }
    }
}

/// Compensation derived from the ledger at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LedgerSnapshot {
    pub employee_id: u64,
    #[schema(value_type = String)]
    pub base_ctc: Decimal,
    /// Sum of every committed monthly increment.
    #[schema(value_type = String)]
    pub cumulative_monthly_increment: Decimal,
    #[schema(value_type = String)]
    pub current_ctc: Decimal,
    /// Number of ledger rows; used to detect concurrent commits.
    pub version: u64,
}
