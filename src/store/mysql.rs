use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error};

use super::{EmployeeFilter, Store, StoreError};
use crate::model::{
    admin::Admin,
    document::{Document, DocumentType, NewDocument},
    employee::{Employee, EmployeeCode, EmployeeStatus, NewEmployee},
    increment::{IncrementHistory, LedgerSnapshot, NewIncrement},
    payment::{DashboardStats, Payment, PaymentStatus, PaymentView, StatusTotals},
};

const EMPLOYEE_COLUMNS: &str = r#"
    id, employee_code, full_name, email, phone, address, aadhar_no, pan_no,
    designation, department, base_ctc, joining_date, resignation_date, status,
    account_holder, account_number, bank_name, branch, ifsc_code,
    created_at, updated_at
"#;

const DOCUMENT_COLUMNS: &str = r#"
    id, employee_id, document_type, filename, file_path, month, year,
    generated_at, generated_by
"#;

// Helper enum for typed SQLx binding
enum FilterValue {
    Str(String),
}

#[derive(FromRow)]
struct PaymentViewRow {
    id: u64,
    employee_name: String,
    employee_code: String,
    document_type: Option<String>,
    amount: Decimal,
    status: String,
    due_date: Option<NaiveDate>,
    paid_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlStore { pool }
    }

    async fn fetch_document(&self, id: u64) -> Result<Document, StoreError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?");
        sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self, sql: &str) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await?)
    }

    async fn payment_totals(&self, status: PaymentStatus) -> Result<StatusTotals, StoreError> {
        let (count, amount): (i64, Decimal) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM payments WHERE status = ?",
        )
        .bind(status.as_ref())
        .fetch_one(&self.pool)
        .await?;
        Ok(StatusTotals { count, amount })
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn find_employee_by_identity(
        &self,
        full_name: &str,
        aadhar_no: Option<&str>,
    ) -> Result<Option<Employee>, StoreError> {
        // `<=>` matches NULL aadhar numbers too
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE full_name = ? AND aadhar_no <=> ? LIMIT 1"
        );
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(full_name)
            .bind(aadhar_no)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_employee(&self, new: NewEmployee) -> Result<Employee, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (full_name, email, phone, address, aadhar_no, pan_no, designation, department,
             base_ctc, joining_date, resignation_date, status,
             account_holder, account_number, bank_name, branch, ifsc_code)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(&new.aadhar_no)
        .bind(&new.pan_no)
        .bind(&new.designation)
        .bind(&new.department)
        .bind(new.base_ctc)
        .bind(new.joining_date)
        .bind(new.resignation_date)
        .bind(new.status.as_ref())
        .bind(&new.bank.account_holder)
        .bind(&new.bank.account_number)
        .bind(&new.bank.bank_name)
        .bind(&new.bank.branch)
        .bind(&new.bank.ifsc_code)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_id();
        let code = EmployeeCode::from_row_id(id);
        sqlx::query("UPDATE employees SET employee_code = ? WHERE id = ?")
            .bind(code.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(employee_id = id, code = %code, "Employee created");

        self.get_employee(id).await
    }

    async fn get_employee(&self, id: u64) -> Result<Employee, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<(Vec<Employee>, i64), StoreError> {
        let per_page = filter.per_page.clamp(1, 100);
        let page = filter.page.max(1);
        let offset = (page - 1) * per_page;

        // ---------- build WHERE clause dynamically ----------
        let mut conditions = Vec::new();
        let mut bindings: Vec<FilterValue> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            bindings.push(FilterValue::Str(status.as_ref().to_string()));
        }

        if let Some(search) = &filter.search {
            conditions.push("(full_name LIKE ? OR employee_code LIKE ? OR email LIKE ?)");
            let like = format!("%{}%", search);
            bindings.push(FilterValue::Str(like.clone()));
            bindings.push(FilterValue::Str(like.clone()));
            bindings.push(FilterValue::Str(like));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for FilterValue::Str(value) in &bindings {
            count_query = count_query.bind(value);
        }
        let total = count_query.fetch_one(&self.pool).await.map_err(|e| {
            error!(error = %e, sql = %count_sql, "Failed to count employees");
            StoreError::from(e)
        })?;

        let data_sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

        let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
        for FilterValue::Str(value) in &bindings {
            data_query = data_query.bind(value);
        }
        let employees = data_query
            .bind(per_page as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok((employees, total))
    }

    async fn delete_employee(&self, id: u64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for sql in [
            "DELETE FROM payments WHERE employee_id = ?",
            "DELETE FROM documents WHERE employee_id = ?",
            "DELETE FROM increment_history WHERE employee_id = ?",
        ] {
            sqlx::query(sql).bind(id).execute(&mut *tx).await?;
        }

        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_employee_status(
        &self,
        id: u64,
        status: EmployeeStatus,
        resignation_date: Option<NaiveDate>,
    ) -> Result<Employee, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET status = ?, resignation_date = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(resignation_date)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_employee(id).await
    }

    async fn increment_history(
        &self,
        employee_id: u64,
    ) -> Result<Vec<IncrementHistory>, StoreError> {
        Ok(sqlx::query_as::<_, IncrementHistory>(
            r#"
            SELECT id, employee_id, old_ctc, increment_amount, new_ctc, effective_date,
                   generated_at, generated_by
            FROM increment_history
            WHERE employee_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn ledger_snapshot(&self, employee_id: u64) -> Result<LedgerSnapshot, StoreError> {
        let row: Option<(Decimal, Decimal, i64)> = sqlx::query_as(
            r#"
            SELECT e.base_ctc,
                   COALESCE(SUM(h.increment_amount), 0),
                   COUNT(h.id)
            FROM employees e
            LEFT JOIN increment_history h ON h.employee_id = e.id
            WHERE e.id = ?
            GROUP BY e.id, e.base_ctc
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        let (base_ctc, cumulative, version) = row.ok_or(StoreError::NotFound)?;
        Ok(LedgerSnapshot {
            employee_id,
            base_ctc,
            cumulative_monthly_increment: cumulative,
            current_ctc: base_ctc + cumulative * Decimal::from(12),
            version: version as u64,
        })
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents
            (employee_id, document_type, filename, file_path, month, year, generated_at, generated_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.employee_id)
        .bind(document.document_type.as_ref())
        .bind(&document.filename)
        .bind(&document.file_path)
        .bind(&document.month)
        .bind(document.year)
        .bind(document.generated_at)
        .bind(&document.generated_by)
        .execute(&self.pool)
        .await?;

        Ok(document.stored(result.last_insert_id()))
    }

    async fn commit_increment_letter(
        &self,
        document: NewDocument,
        increment: NewIncrement,
        expected_version: u64,
    ) -> Result<(Document, IncrementHistory), StoreError> {
        let mut tx = self.pool.begin().await?;

        // serialise concurrent commits for the same employee
        sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(increment.employee_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;

        let version: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM increment_history WHERE employee_id = ?")
                .bind(increment.employee_id)
                .fetch_one(&mut *tx)
                .await?;
        if version as u64 != expected_version {
            tx.rollback().await?;
            return Err(StoreError::Conflict(format!(
                "ledger version {version}, expected {expected_version}"
            )));
        }

        let inc = sqlx::query(
            r#"
            INSERT INTO increment_history
            (employee_id, old_ctc, increment_amount, new_ctc, effective_date, generated_at, generated_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(increment.employee_id)
        .bind(increment.old_ctc)
        .bind(increment.increment_amount)
        .bind(increment.new_ctc)
        .bind(increment.effective_date)
        .bind(increment.generated_at)
        .bind(&increment.generated_by)
        .execute(&mut *tx)
        .await?;

        let doc = sqlx::query(
            r#"
            INSERT INTO documents
            (employee_id, document_type, filename, file_path, month, year, generated_at, generated_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.employee_id)
        .bind(document.document_type.as_ref())
        .bind(&document.filename)
        .bind(&document.file_path)
        .bind(&document.month)
        .bind(document.year)
        .bind(document.generated_at)
        .bind(&document.generated_by)
        .execute(&mut *tx)
        .await?;

        let history = increment.stored(inc.last_insert_id());
        let document = document.stored(doc.last_insert_id());

        // built before the commit so a committed letter never comes back as an error
        tx.commit().await?;
        Ok((document, history))
    }

    async fn list_documents(&self, employee_id: u64) -> Result<Vec<Document>, StoreError> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE employee_id = ? ORDER BY generated_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Document>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_document(&self, id: u64) -> Result<Document, StoreError> {
        self.fetch_document(id).await
    }

    async fn list_payments(&self) -> Result<Vec<PaymentView>, StoreError> {
        let rows = sqlx::query_as::<_, PaymentViewRow>(
            r#"
            SELECT p.id, e.full_name AS employee_name, e.employee_code,
                   d.document_type, p.amount, p.status, p.due_date, p.paid_date
            FROM payments p
            JOIN employees e ON e.id = p.employee_id
            LEFT JOIN documents d ON d.id = p.document_id
            ORDER BY p.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status = row
                    .status
                    .parse::<PaymentStatus>()
                    .map_err(|e| StoreError::Database(format!("bad payment status: {e}")))?;
                Ok(PaymentView {
                    id: row.id,
                    employee_name: row.employee_name,
                    employee_code: row.employee_code,
                    document_type: row
                        .document_type
                        .and_then(|t| t.parse::<DocumentType>().ok()),
                    amount: row.amount,
                    status,
                    due_date: row.due_date,
                    paid_date: row.paid_date,
                })
            })
            .collect()
    }

    async fn mark_payment_paid(&self, id: u64, paid_on: NaiveDate) -> Result<Payment, StoreError> {
        let result =
            sqlx::query("UPDATE payments SET status = 'paid', paid_date = ? WHERE id = ?")
                .bind(paid_on)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, employee_id, document_id, amount, status, due_date, paid_date,
                   payment_method, transaction_id, notes, created_at
            FROM payments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        Ok(DashboardStats {
            total_employees: self.count("SELECT COUNT(*) FROM employees").await?,
            active_employees: self
                .count("SELECT COUNT(*) FROM employees WHERE status = 'active'")
                .await?,
            total_documents: self.count("SELECT COUNT(*) FROM documents").await?,
            paid: self.payment_totals(PaymentStatus::Paid).await?,
            pending: self.payment_totals(PaymentStatus::Pending).await?,
            overdue: self.payment_totals(PaymentStatus::Overdue).await?,
        })
    }

    async fn count_admins(&self) -> Result<i64, StoreError> {
        self.count("SELECT COUNT(*) FROM admins").await
    }

    async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
        role_id: u8,
    ) -> Result<Admin, StoreError> {
        let created_at = Local::now().naive_local();
        let result = sqlx::query(
            "INSERT INTO admins (username, password_hash, role_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role_id)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Admin {
            id: result.last_insert_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role_id,
            created_at,
        })
    }

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, username, password_hash, role_id, created_at
            FROM admins
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }
}
