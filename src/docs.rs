use crate::api::employee::{EmployeeDetail, EmployeeListResponse, StatusChange};
use crate::api::wizard::{BundleResponse, WizardStarted};
use crate::documents::GenerationOutcome;
use crate::model::company::Company;
use crate::model::document::{Document, DocumentType};
use crate::model::employee::{BankDetails, Employee, EmployeeStatus, NewEmployee};
use crate::model::increment::{IncrementHistory, LedgerSnapshot};
use crate::model::payment::{DashboardStats, Payment, PaymentStatus, PaymentView, StatusTotals};
use crate::models::{LoginReqDto, LoginResponse, SetupReqDto};
use crate::wizard::{DocumentRequest, WizardForm, WizardStage};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Document Service API",
        version = "1.0.0",
        description = r#"
## HR Document Service

Generates employment documents (offer letters, salary slips, increment letters,
experience and relieving letters) as PDFs from employee records.

### Key Features
- **Document wizard**
  - Submit a form, preview the HTML, then generate PDFs
  - Salary slips are produced per month and bundled into a ZIP archive
- **Increment ledger**
  - Increment letters record the raise; the current CTC is derived from the ledger
- **Employee records**
  - Create, list, view, delete and change lifecycle status
- **Payments**
  - Track payments tied to documents, mark them paid, view dashboard totals

### Security
Everything under `/api` requires a **JWT Bearer** token issued by `/auth/login`.
The `/wizard` endpoints are public and keyed by the `wizard_session` cookie.
"#,
    ),
    paths(
        crate::auth::handlers::setup,
        crate::auth::handlers::login,

        crate::api::wizard::submit,
        crate::api::wizard::preview,
        crate::api::wizard::preview_part,
        crate::api::wizard::bundle,
        crate::api::wizard::bundle_part,
        crate::api::wizard::generate,
        crate::api::wizard::generate_part,
        crate::api::wizard::abandon,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::set_status,

        crate::api::document::start_document,
        crate::api::document::list_documents,
        crate::api::document::download,

        crate::api::payment::list_payments,
        crate::api::payment::mark_paid,
        crate::api::payment::dashboard,

        crate::api::company::list_companies
    ),
    components(
        schemas(
            LoginReqDto,
            SetupReqDto,
            LoginResponse,
            WizardForm,
            WizardStarted,
            WizardStage,
            BundleResponse,
            DocumentRequest,
            GenerationOutcome,
            DocumentType,
            Document,
            Employee,
            EmployeeStatus,
            BankDetails,
            NewEmployee,
            EmployeeListResponse,
            EmployeeDetail,
            StatusChange,
            IncrementHistory,
            LedgerSnapshot,
            Payment,
            PaymentStatus,
            PaymentView,
            StatusTotals,
            DashboardStats,
            Company
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Admin setup and login"),
        (name = "Wizard", description = "Public document wizard"),
        (name = "Employee", description = "Employee records and lifecycle"),
        (name = "Document", description = "Generated documents"),
        (name = "Payment", description = "Payments and dashboard"),
        (name = "Company", description = "Configured companies"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
