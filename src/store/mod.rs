//! Persistence boundary for employees, documents, the increment ledger,
//! payments and admin accounts.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{
    admin::Admin,
    document::{Document, NewDocument},
    employee::{Employee, EmployeeStatus, NewEmployee},
    increment::{IncrementHistory, LedgerSnapshot, NewIncrement},
    payment::{DashboardStats, Payment, PaymentView},
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000") => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub status: Option<EmployeeStatus>,
    /// Substring match on name, code or email.
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Employees
    async fn find_employee_by_identity(
        &self,
        full_name: &str,
        aadhar_no: Option<&str>,
    ) -> Result<Option<Employee>, StoreError>;
    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, StoreError>;
    async fn get_employee(&self, id: u64) -> Result<Employee, StoreError>;
    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<(Vec<Employee>, i64), StoreError>;
    /// Removes the employee together with its documents, ledger and payments.
    async fn delete_employee(&self, id: u64) -> Result<(), StoreError>;
    async fn set_employee_status(
        &self,
        id: u64,
        status: EmployeeStatus,
        resignation_date: Option<NaiveDate>,
    ) -> Result<Employee, StoreError>;

    // Increment ledger
    async fn increment_history(&self, employee_id: u64)
    -> Result<Vec<IncrementHistory>, StoreError>;
    /// Current CTC derived from base CTC and every committed increment.
    async fn ledger_snapshot(&self, employee_id: u64) -> Result<LedgerSnapshot, StoreError>;

    // Documents
    async fn insert_document(&self, document: NewDocument) -> Result<Document, StoreError>;
    /// Writes the increment row and its document atomically. Fails with
    /// `Conflict` when the ledger no longer has `expected_version` rows.
    async fn commit_increment_letter(
        &self,
        document: NewDocument,
        increment: NewIncrement,
        expected_version: u64,
    ) -> Result<(Document, IncrementHistory), StoreError>;
    async fn list_documents(&self, employee_id: u64) -> Result<Vec<Document>, StoreError>;
    async fn get_document(&self, id: u64) -> Result<Document, StoreError>;

    // Payments
    async fn list_payments(&self) -> Result<Vec<PaymentView>, StoreError>;
    async fn mark_payment_paid(&self, id: u64, paid_on: NaiveDate) -> Result<Payment, StoreError>;
    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError>;

    // Admins
    async fn count_admins(&self) -> Result<i64, StoreError>;
    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
        role_id: u8,
    ) -> Result<Admin, StoreError>;
    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, StoreError>;
}
