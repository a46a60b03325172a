use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;

use super::{EmployeeFilter, Store, StoreError};
use crate::{
    ledger,
    model::{
        admin::Admin,
        document::{Document, NewDocument},
        employee::{Employee, EmployeeCode, EmployeeStatus, NewEmployee},
        increment::{IncrementHistory, LedgerSnapshot, NewIncrement},
        payment::{DashboardStats, Payment, PaymentStatus, PaymentView, StatusTotals},
    },
};

#[derive(Default)]
struct Tables {
    employees: Vec<Employee>,
    documents: Vec<Document>,
    increments: Vec<IncrementHistory>,
    payments: Vec<Payment>,
    admins: Vec<Admin>,
    next_employee_id: u64,
    next_document_id: u64,
    next_increment_id: u64,
    next_admin_id: u64,
}

impl Tables {
    fn employee(&self, id: u64) -> Result<&Employee, StoreError> {
        self.employees
            .iter()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)
    }

    fn history(&self, employee_id: u64) -> Vec<IncrementHistory> {
        self.increments
            .iter()
            .filter(|row| row.employee_id == employee_id)
            .cloned()
            .collect()
    }

    fn insert_document(&mut self, doc: NewDocument) -> Document {
        self.next_document_id += 1;
        let document = doc.stored(self.next_document_id);
        self.documents.push(document.clone());
        document
    }

    fn unique_taken(&self, value: &Option<String>, pick: fn(&Employee) -> &Option<String>) -> bool {
        match value {
            Some(v) => self.employees.iter().any(|e| pick(e).as_deref() == Some(v.as_str())),
            None => false,
        }
    }
}

/// In-process store. Every operation runs under one lock, so multi-row
/// writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store poisoned".into()))
    }

    /// Seeds a payment row; payments are created outside the document flow.
    pub fn add_payment(
        &self,
        employee_id: u64,
        document_id: Option<u64>,
        amount: Decimal,
        status: PaymentStatus,
        due_date: Option<NaiveDate>,
    ) -> Result<Payment, StoreError> {
        let mut tables = self.lock()?;
        tables.employee(employee_id)?;
        let payment = Payment {
            id: tables.payments.len() as u64 + 1,
            employee_id,
            document_id,
            amount,
            status,
            due_date,
            paid_date: None,
            payment_method: None,
            transaction_id: None,
            notes: None,
            created_at: Local::now().naive_local(),
        };
        tables.payments.push(payment.clone());
        Ok(payment)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_employee_by_identity(
        &self,
        full_name: &str,
        aadhar_no: Option<&str>,
    ) -> Result<Option<Employee>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .employees
            .iter()
            .find(|e| e.full_name == full_name && e.aadhar_no.as_deref() == aadhar_no)
            .cloned())
    }

    async fn create_employee(&self, new: NewEmployee) -> Result<Employee, StoreError> {
        let mut tables = self.lock()?;
        if tables.unique_taken(&new.aadhar_no, |e| &e.aadhar_no) {
            return Err(StoreError::Conflict("aadhar_no already registered".into()));
        }
        if tables.unique_taken(&new.pan_no, |e| &e.pan_no) {
            return Err(StoreError::Conflict("pan_no already registered".into()));
        }
        if tables.unique_taken(&new.email, |e| &e.email) {
            return Err(StoreError::Conflict("email already registered".into()));
        }

        tables.next_employee_id += 1;
        let id = tables.next_employee_id;
        let now = Local::now().naive_local();
        let employee = Employee {
            id,
            employee_code: EmployeeCode::from_row_id(id),
            full_name: new.full_name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            aadhar_no: new.aadhar_no,
            pan_no: new.pan_no,
            designation: new.designation,
            department: new.department,
            base_ctc: new.base_ctc,
            joining_date: new.joining_date,
            resignation_date: new.resignation_date,
            status: new.status,
            bank: new.bank,
            created_at: now,
            updated_at: now,
        };
        tables.employees.push(employee.clone());
        Ok(employee)
    }

    async fn get_employee(&self, id: u64) -> Result<Employee, StoreError> {
        self.lock()?.employee(id).cloned()
    }

    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<(Vec<Employee>, i64), StoreError> {
        let tables = self.lock()?;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut matching: Vec<Employee> = tables
            .employees
            .iter()
            .filter(|e| filter.status.is_none_or(|s| e.status == s))
            .filter(|e| match &search {
                Some(needle) => {
                    e.full_name.to_lowercase().contains(needle)
                        || e.employee_code.as_str().to_lowercase().contains(needle)
                        || e.email
                            .as_deref()
                            .is_some_and(|m| m.to_lowercase().contains(needle))
                }
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matching.len() as i64;
        let per_page = filter.per_page.max(1) as usize;
        let offset = (filter.page.max(1) as usize - 1) * per_page;
        let page = matching.into_iter().skip(offset).take(per_page).collect();
        Ok((page, total))
    }

    async fn delete_employee(&self, id: u64) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.employee(id)?;
        tables.documents.retain(|d| d.employee_id != id);
        tables.increments.retain(|r| r.employee_id != id);
        tables.payments.retain(|p| p.employee_id != id);
        tables.employees.retain(|e| e.id != id);
        Ok(())
    }

    async fn set_employee_status(
        &self,
        id: u64,
        status: EmployeeStatus,
        resignation_date: Option<NaiveDate>,
    ) -> Result<Employee, StoreError> {
        let mut tables = self.lock()?;
        let employee = tables
            .employees
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;
        employee.status = status;
        employee.resignation_date = resignation_date;
        employee.updated_at = Local::now().naive_local();
        Ok(employee.clone())
    }

    async fn increment_history(
        &self,
        employee_id: u64,
    ) -> Result<Vec<IncrementHistory>, StoreError> {
        let tables = self.lock()?;
        tables.employee(employee_id)?;
        Ok(tables.history(employee_id))
    }

    async fn ledger_snapshot(&self, employee_id: u64) -> Result<LedgerSnapshot, StoreError> {
        let tables = self.lock()?;
        let employee = tables.employee(employee_id)?;
        Ok(ledger::snapshot(employee, &tables.history(employee_id)))
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document, StoreError> {
        let mut tables = self.lock()?;
        tables.employee(document.employee_id)?;
        Ok(tables.insert_document(document))
    }

    async fn commit_increment_letter(
        &self,
        document: NewDocument,
        increment: NewIncrement,
        expected_version: u64,
    ) -> Result<(Document, IncrementHistory), StoreError> {
        let mut tables = self.lock()?;
        tables.employee(increment.employee_id)?;

        let version = tables.history(increment.employee_id).len() as u64;
        if version != expected_version {
            return Err(StoreError::Conflict(format!(
                "ledger version {version}, expected {expected_version}"
            )));
        }

        tables.next_increment_id += 1;
        let row = increment.stored(tables.next_increment_id);
        tables.increments.push(row.clone());
        let document = tables.insert_document(document);
        Ok((document, row))
    }

    async fn list_documents(&self, employee_id: u64) -> Result<Vec<Document>, StoreError> {
        let tables = self.lock()?;
        let mut docs: Vec<Document> = tables
            .documents
            .iter()
            .filter(|d| d.employee_id == employee_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.generated_at.cmp(&a.generated_at).then(b.id.cmp(&a.id)));
        Ok(docs)
    }

    async fn get_document(&self, id: u64) -> Result<Document, StoreError> {
        self.lock()?
            .documents
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_payments(&self) -> Result<Vec<PaymentView>, StoreError> {
        let tables = self.lock()?;
        tables
            .payments
            .iter()
            .map(|p| -> Result<PaymentView, StoreError> {
                let employee = tables.employee(p.employee_id)?;
                let document_type = p.document_id.and_then(|doc_id| {
                    tables
                        .documents
                        .iter()
                        .find(|d| d.id == doc_id)
                        .map(|d| d.document_type)
                });
                Ok(PaymentView {
                    id: p.id,
                    employee_name: employee.full_name.clone(),
                    employee_code: employee.employee_code.to_string(),
                    document_type,
                    amount: p.amount,
                    status: p.status,
                    due_date: p.due_date,
                    paid_date: p.paid_date,
                })
            })
            .collect()
    }

    async fn mark_payment_paid(&self, id: u64, paid_on: NaiveDate) -> Result<Payment, StoreError> {
        let mut tables = self.lock()?;
        let payment = tables
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        payment.status = PaymentStatus::Paid;
        payment.paid_date = Some(paid_on);
        Ok(payment.clone())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let tables = self.lock()?;
        let totals = |status: PaymentStatus| {
            tables
                .payments
                .iter()
                .filter(|p| p.status == status)
                .fold(StatusTotals::default(), |acc, p| StatusTotals {
                    count: acc.count + 1,
                    amount: acc.amount + p.amount,
                })
        };

        Ok(DashboardStats {
            total_employees: tables.employees.len() as i64,
            active_employees: tables
                .employees
                .iter()
                .filter(|e| e.status == EmployeeStatus::Active)
                .count() as i64,
            total_documents: tables.documents.len() as i64,
            paid: totals(PaymentStatus::Paid),
            pending: totals(PaymentStatus::Pending),
            overdue: totals(PaymentStatus::Overdue),
        })
    }

    async fn count_admins(&self) -> Result<i64, StoreError> {
        Ok(self.lock()?.admins.len() as i64)
    }

    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
        role_id: u8,
    ) -> Result<Admin, StoreError> {
        let mut tables = self.lock()?;
        if tables.admins.iter().any(|a| a.username == username) {
            return Err(StoreError::Conflict("username already exists".into()));
        }
        tables.next_admin_id += 1;
        let admin = Admin {
            id: tables.next_admin_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role_id,
            created_at: Local::now().naive_local(),
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self
            .lock()?
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }
}
