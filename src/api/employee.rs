use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    ledger,
    model::{
        document::Document,
        employee::{Employee, EmployeeStatus, NewEmployee},
        increment::{IncrementHistory, LedgerSnapshot},
    },
    payroll::MAX_AMOUNT,
    state::AppState,
    store::{EmployeeFilter, StoreError},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[param(value_type = Option<String>, example = "active")]
    pub status: Option<EmployeeStatus>,
    /// Matches name, employee code or email.
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

/// Employee together with the ledger-derived compensation.
#[derive(Serialize, ToSchema)]
pub struct EmployeeDetail {
    pub employee: Employee,
    pub ledger: LedgerSnapshot,
    pub increments: Vec<IncrementHistory>,
    pub documents: Vec<Document>,
}

#[derive(Deserialize, ToSchema)]
pub struct StatusChange {
    #[schema(example = "resigned")]
    pub status: EmployeeStatus,
}

fn employee_not_found(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound("employee"),
        other => other.into(),
    }
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "National ID already on file")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewEmployee>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let mut new = payload.into_inner();
    new.full_name = new.full_name.trim().to_string();
    if new.full_name.is_empty() {
        return Err(AppError::MissingField("full_name").into());
    }
    if new.base_ctc.is_sign_negative() {
        return Err(AppError::invalid("base_ctc", "base CTC must not be negative").into());
    }
    if new.base_ctc > MAX_AMOUNT {
        return Err(AppError::invalid(
            "base_ctc",
            format!("base CTC must not exceed {MAX_AMOUNT}"),
        )
        .into());
    }

    let employee = state
        .store
        .create_employee(new)
        .await
        .map_err(AppError::from)?;
    info!(employee_id = employee.id, code = %employee.employee_code, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let query = query.into_inner();
    let filter = EmployeeFilter {
        status: query.status,
        search: query.search.filter(|s| !s.trim().is_empty()),
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(20).clamp(1, 100),
    };
    debug!(?filter, "Listing employees");

    let (data, total) = state
        .store
        .list_employees(&filter)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page: filter.page,
        per_page: filter.per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDetail),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let employee = state
        .store
        .get_employee(employee_id)
        .await
        .map_err(employee_not_found)?;
    let increments = state
        .store
        .increment_history(employee_id)
        .await
        .map_err(AppError::from)?;
    let documents = state
        .store
        .list_documents(employee_id)
        .await
        .map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(EmployeeDetail {
        ledger: ledger::snapshot(&employee, &increments),
        employee,
        increments,
        documents,
    }))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 204, description = "Employee and their documents deleted"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let documents = state
        .store
        .list_documents(employee_id)
        .await
        .map_err(AppError::from)?;
    state
        .store
        .delete_employee(employee_id)
        .await
        .map_err(employee_not_found)?;

    // files go after the rows; a leftover file is harmless
    let paths: Vec<String> = documents.into_iter().map(|d| d.file_path).collect();
    let removed = web::block(move || {
        paths
            .iter()
            .filter(|p| std::fs::remove_file(p).is_ok())
            .count()
    })
    .await;
    match removed {
        Ok(count) => info!(employee_id, files_removed = count, "Employee deleted"),
        Err(e) => warn!(employee_id, error = %e, "Employee deleted; file cleanup failed"),
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Change lifecycle status
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}/status",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status updated", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_status(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<StatusChange>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let employee = state
        .store
        .get_employee(employee_id)
        .await
        .map_err(employee_not_found)?;
    let today: NaiveDate = Local::now().date_naive();
    let (status, resignation_date) = ledger::status_change(&employee, payload.status, today);

    let updated = state
        .store
        .set_employee_status(employee_id, status, resignation_date)
        .await
        .map_err(employee_not_found)?;
    info!(employee_id, status = ?status, "Employee status changed");

    Ok(HttpResponse::Ok().json(updated))
}
