#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use actix_web::{http::Method, test::TestRequest};
use hrdocs::{
    config::Config,
    documents::{AskamaRenderer, NoopUploader, PdfConverter},
    model::company::{Company, CompanyDirectory},
    state::AppState,
    store::MemoryStore,
    wizard::SESSION_HEADER,
};

/// Writes the markup as the "PDF" unless the file name contains one of
/// `fail_on`.
pub struct ScriptedConverter {
    fail_on: Vec<&'static str>,
}

impl PdfConverter for ScriptedConverter {
    fn convert(&self, markup: &str, destination: &Path) -> bool {
        let name = destination
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if self.fail_on.iter().any(|pattern| name.contains(pattern)) {
            return false;
        }
        if let Some(parent) = destination.parent() {
            if fs::create_dir_all(parent).is_err() {
                return false;
            }
        }
        fs::write(destination, markup).is_ok()
    }
}

pub struct Harness {
    pub config: Config,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub output_dir: PathBuf,
}

impl Harness {
    pub fn new(fail_on: &[&'static str]) -> Self {
        let output_dir =
            std::env::temp_dir().join(format!("hrdocs-it-{}", uuid::Uuid::new_v4()));
        let mut config = Config::new("127.0.0.1:0", "integration-secret");
        config.output_dir = output_dir.clone();

        let companies = CompanyDirectory::new(vec![
            Company {
                id: "company1".into(),
                display_name: "Lakshmi Consultancy Pvt. Ltd.".into(),
                letterhead_asset: "letterheads/lc.png".into(),
            },
            Company {
                id: "company2".into(),
                display_name: "ARR Technologies Pvt. Ltd.".into(),
                letterhead_asset: "letterheads/arr.png".into(),
            },
        ]);

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            &config,
            store.clone(),
            companies,
            Arc::new(AskamaRenderer),
            Arc::new(ScriptedConverter {
                fail_on: fail_on.to_vec(),
            }),
            Arc::new(NoopUploader),
        );

        Harness {
            config,
            state,
            store,
            output_dir,
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.output_dir);
    }
}

/// Every request needs a peer address for the rate limiter.
pub fn request(method: Method, uri: &str) -> TestRequest {
    TestRequest::default()
        .method(method)
        .uri(uri)
        .peer_addr("127.0.0.1:40000".parse().unwrap())
}

pub fn in_session(req: TestRequest, session: &str) -> TestRequest {
    req.insert_header((SESSION_HEADER, session.to_string()))
}

pub fn bearer(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {token}")))
}

#[macro_export]
macro_rules! app {
    ($harness:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($harness.state.clone()))
                .app_data(actix_web::web::Data::new($harness.config.clone()))
                .configure(|cfg| hrdocs::routes::configure(cfg, $harness.config.clone())),
        )
        .await
    };
}

/// Creates the first admin and returns a bearer token for it.
#[macro_export]
macro_rules! admin_token {
    ($app:expr) => {{
        let credentials = serde_json::json!({ "username": "admin", "password": "s3cret-pass" });
        let resp = actix_web::test::call_service(
            &$app,
            $crate::common::request(actix_web::http::Method::POST, "/auth/setup")
                .set_json(&credentials)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

        let resp = actix_web::test::call_service(
            &$app,
            $crate::common::request(actix_web::http::Method::POST, "/auth/login")
                .set_json(&credentials)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        body["access_token"].as_str().unwrap().to_string()
    }};
}
