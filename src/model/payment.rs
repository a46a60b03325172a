use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::model::document::DocumentType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

impl TryFrom<String> for PaymentStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payment {
    pub id: u64,
    pub employee_id: u64,
    pub document_id: Option<u64>,
    #[schema(value_type = String, example = "49800")]
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    #[schema(value_type = Option<String>, format = "date")]
    pub due_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub paid_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

/// Payment joined with its employee and, when linked, its document.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentView {
    pub id: u64,
    pub employee_name: String,
    #[schema(example = "EMP0001")]
    pub employee_code: String,
    pub document_type: Option<DocumentType>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub status: PaymentStatus,
    #[schema(value_type = Option<String>, format = "date")]
    pub due_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusTotals {
    pub count: i64,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_employees: i64,
    pub active_employees: i64,
    pub total_documents: i64,
    pub paid: StatusTotals,
    pub pending: StatusTotals,
    pub overdue: StatusTotals,
}
