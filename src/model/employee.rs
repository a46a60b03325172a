use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Resigned,
    Terminated,
}

impl TryFrom<String> for EmployeeStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Human facing employee identifier, `EMP` followed by the zero-padded row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeCode(pub String);

impl EmployeeCode {
    pub fn from_row_id(id: u64) -> Self {
        EmployeeCode(format!("EMP{id:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct BankDetails {
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub branch: Option<String>,
    pub ifsc_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP0001",
        "full_name": "Asha Rao",
        "email": "asha.rao@company.com",
        "phone": "+919812345678",
        "address": "12 MG Road, Pune",
        "aadhar_no": "123412341234",
        "pan_no": "ABCDE1234F",
        "designation": "Engineer",
        "department": "Platform",
        "base_ctc": "600000",
        "joining_date": "2024-01-01",
        "resignation_date": null,
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(value_type = String, example = "EMP0001")]
    #[sqlx(try_from = "String")]
    pub employee_code: EmployeeCode,

    #[schema(example = "Asha Rao")]
    pub full_name: String,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// Unique national identity number
    pub aadhar_no: Option<String>,
    pub pan_no: Option<String>,

    pub designation: Option<String>,
    pub department: Option<String>,

    /// Annual CTC at hire. The current CTC is derived from the increment ledger.
    #[schema(value_type = String, example = "600000")]
    pub base_ctc: Decimal,

    #[schema(value_type = Option<String>, format = "date")]
    pub joining_date: Option<NaiveDate>,

    #[schema(value_type = Option<String>, format = "date")]
    pub resignation_date: Option<NaiveDate>,

    #[sqlx(try_from = "String")]
    pub status: EmployeeStatus,

    #[sqlx(flatten)]
    pub bank: BankDetails,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

impl From<String> for EmployeeCode {
    fn from(value: String) -> Self {
        EmployeeCode(value)
    }
}

/// Fields needed to create an employee; the code is assigned by the store.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewEmployee {
    #[schema(example = "Asha Rao")]
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub aadhar_no: Option<String>,
    pub pan_no: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    #[schema(value_type = String, example = "600000")]
    #[serde(default)]
    pub base_ctc: Decimal,
    #[schema(value_type = Option<String>, format = "date", example = "2024-01-01")]
    pub joining_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub resignation_date: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: EmployeeStatus,
    #[serde(default)]
    pub bank: BankDetails,
}

fn default_status() -> EmployeeStatus {
    EmployeeStatus::Active
}

impl NewEmployee {
    pub fn named(full_name: impl Into<String>) -> Self {
        NewEmployee {
            full_name: full_name.into(),
            email: None,
            phone: None,
            address: None,
            aadhar_no: None,
            pan_no: None,
            designation: None,
            department: None,
            base_ctc: Decimal::ZERO,
            joining_date: None,
            resignation_date: None,
            status: EmployeeStatus::Active,
            bank: BankDetails::default(),
        }
    }
}
