#[macro_use]
mod common;

use actix_web::{
    http::{Method, StatusCode},
    test,
};
use hrdocs::store::Store;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use common::{Harness, in_session, request};

fn salary_form() -> Value {
    json!({
        "document_type": "salary_slip",
        "full_name": "Asha Rao",
        "aadhar_no": "123412341234",
        "designation": "Engineer",
        "ctc": "600000",
        "months": ["January", "february"],
        "year": "2024"
    })
}

fn increment_form() -> Value {
    json!({
        "document_type": "increment_letter",
        "full_name": "Ravi Kumar",
        "aadhar_no": "999988887777",
        "designation": "Analyst",
        "ctc": "600000",
        "increment_amount": "5000",
        "effective_date": "2024-04-01"
    })
}

#[actix_web::test]
async fn submit_then_bundle_shows_the_salary_structure() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let form = json!({
        "document_type": "offer_letter",
        "full_name": "Asha Rao",
        "designation": "Engineer",
        "ctc": "600000",
        "joining_date": "2024-03-18",
        "company": "company2"
    });
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(&form).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp.response().cookies().any(|c| c.name() == "wizard_session"));
    let started: Value = test::read_body_json(resp).await;
    assert_eq!(started["employee_code"], "EMP0001");
    assert_eq!(started["stage"], "previewing");
    let session = started["session"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/bundle"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let bundle = &body["bundle"];
    assert_eq!(body["document_type"], "offer_letter");
    assert_eq!(bundle["monthly_ctc"], "50000");
    assert_eq!(bundle["basic"], "25000");
    assert_eq!(bundle["hra"], "12500");
    assert_eq!(bundle["special_allowance"], "8300");
    assert_eq!(bundle["net_salary"], "49800");
    assert_eq!(bundle["watermark"], "arr_logo.png");
    assert_eq!(bundle["date_before"], "06 March 2024");

    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/preview"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(html.contains("Offer of Employment"));
    assert!(html.contains("ARR Technologies Pvt. Ltd."));
}

#[actix_web::test]
async fn missing_document_type_redirects_to_the_form() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard")
            .set_json(json!({ "full_name": "Asha Rao" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing_field");
    assert_eq!(body["redirect"], "/");

    let (_, total) = harness
        .store
        .list_employees(&Default::default())
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[actix_web::test]
async fn malformed_ctc_is_rejected_without_creating_anyone() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard")
            .set_json(json!({
                "document_type": "offer_letter",
                "full_name": "Asha Rao",
                "ctc": "six lakh"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_input");
}

#[actix_web::test]
async fn preview_without_a_wizard_is_a_conflict() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let resp = test::call_service(&app, request(Method::GET, "/wizard/preview").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "no_active_wizard");
    assert_eq!(body["redirect"], "/");
}

#[actix_web::test]
async fn failed_month_keeps_the_wizard_for_a_retry() {
    let harness = Harness::new(&["February"]);
    let app = app!(harness);

    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(salary_form()).to_request(),
    )
    .await;
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();
    let employee_id = started["employee_id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["failed_months"], json!(["february"]));
    assert_eq!(outcome["completed"], false);
    let documents = outcome["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["month"], "january");
    assert_eq!(documents[0]["filename"], "salary_slip_January_2024.pdf");
    assert!(
        outcome["archive"]
            .as_str()
            .unwrap()
            .ends_with("EMP0001_Salary_Slips.zip")
    );

    let stored = harness.store.list_documents(employee_id).await.unwrap();
    assert_eq!(stored.len(), 1);

    // the wizard now only carries the failed month
    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/bundle"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["bundle"]["month_label"], "February 2024");
    assert_eq!(body["bundle"]["month_labels"], "February 2024");
}

#[actix_web::test]
async fn every_month_failing_is_a_render_failure() {
    let harness = Harness::new(&["salary_slip"]);
    let app = app!(harness);

    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(salary_form()).to_request(),
    )
    .await;
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "render_failure");
}

#[actix_web::test]
async fn increment_is_not_recorded_when_the_letter_fails() {
    let harness = Harness::new(&["increment_letter"]);
    let app = app!(harness);

    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(increment_form()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();
    let employee_id = started["employee_id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    assert!(harness.store.increment_history(employee_id).await.unwrap().is_empty());
    assert!(harness.store.list_documents(employee_id).await.unwrap().is_empty());
    let ledger = harness.store.ledger_snapshot(employee_id).await.unwrap();
    assert_eq!(ledger.version, 0);
    assert_eq!(ledger.current_ctc.to_string(), "600000");

    // still retryable
    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/bundle"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["bundle"]["old_ctc"], "600000");
    assert_eq!(body["bundle"]["new_ctc"], "660000");
    assert_eq!(body["bundle"]["effective_date"], "01 April 2024");
}

#[actix_web::test]
async fn increment_letter_commits_the_ledger_and_closes_the_wizard() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(increment_form()).to_request(),
    )
    .await;
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();
    let employee_id = started["employee_id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["completed"], true);
    assert_eq!(outcome["documents"][0]["document_type"], "increment_letter");
    assert_eq!(outcome["documents"][0]["generated_by"], "system");

    let history = harness.store.increment_history(employee_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_ctc.to_string(), "600000");
    assert_eq!(history[0].new_ctc.to_string(), "660000");

    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/preview"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn concurrent_increment_is_rejected_as_stale() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let mut sessions = Vec::new();
    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            request(Method::POST, "/wizard").set_json(increment_form()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let started: Value = test::read_body_json(resp).await;
        sessions.push((
            started["session"].as_str().unwrap().to_string(),
            started["employee_id"].as_u64().unwrap(),
        ));
    }
    assert_ne!(sessions[0].0, sessions[1].0);
    assert_eq!(sessions[0].1, sessions[1].1);

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &sessions[0].0).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &sessions[1].0).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "stale_increment");

    let employee_id = sessions[0].1;
    assert_eq!(harness.store.increment_history(employee_id).await.unwrap().len(), 1);
    assert_eq!(harness.store.list_documents(employee_id).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn offer_and_salary_previews_and_generates_both_parts() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let form = json!({
        "document_type": "offer_and_salary",
        "full_name": "Meera Iyer",
        "designation": "Designer",
        "ctc": "600000",
        "months": ["january"],
        "year": "2024"
    });
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(&form).to_request(),
    )
    .await;
    let started: Value = test::read_body_json(resp).await;
    assert_eq!(started["parts"], json!(["offer_letter", "salary_slip"]));
    let session = started["session"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/preview/salary_slip"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(html.contains("Salary Slip for January 2024"));

    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/preview/relieving_letter"), &session)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["completed"], true);
    let kinds: Vec<&str> = outcome["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["document_type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["offer_letter", "salary_slip"]);
}

#[actix_web::test]
async fn abandon_is_idempotent() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(salary_form()).to_request(),
    )
    .await;
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            in_session(request(Method::DELETE, "/wizard"), &session).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(harness.store.list_documents(1).await.unwrap().is_empty());
}

#[actix_web::test]
async fn unknown_month_is_rejected_before_anything_is_written() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    for month in ["foo", "../../../../tmp/hrdocs-escaped"] {
        let mut form = salary_form();
        form["months"] = json!(["january", month]);
        let resp = test::call_service(
            &app,
            request(Method::POST, "/wizard").set_json(&form).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{month}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_input");
    }

    let found = harness
        .store
        .find_employee_by_identity("Asha Rao", Some("123412341234"))
        .await
        .unwrap();
    assert!(found.is_none());
    assert!(!harness.output_dir.exists());
}

#[actix_web::test]
async fn abbreviated_months_name_the_slip_files() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let mut form = salary_form();
    form["months"] = json!(["MAR", "march"]);
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(&form).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["documents"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["documents"][0]["filename"], "salary_slip_March_2024.pdf");
    assert_eq!(outcome["documents"][0]["month"], "march");
}

#[actix_web::test]
async fn oversized_amounts_are_invalid_input() {
    let harness = Harness::new(&[]);
    let app = app!(harness);
    let huge = "79228162514264337593543950335";

    // existing employee: the amount is only parsed when the bundle is built
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(salary_form()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let mut form = salary_form();
    form["ctc"] = json!(huge);
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(&form).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/bundle"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_input");

    // new employee
    let mut form = salary_form();
    form["full_name"] = json!("Kiran Das");
    form["aadhar_no"] = json!("111122223333");
    form["ctc"] = json!(huge);
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(&form).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // increment that would push the CTC past what can be stored
    let mut form = increment_form();
    form["increment_amount"] = json!(huge);
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(&form).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn relieving_date_past_the_calendar_is_left_out() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let form = json!({
        "document_type": "relieving_letter",
        "full_name": "Asha Rao",
        "designation": "Engineer",
        "ctc": "600000",
        "joining_date": "2020-01-06",
        "resignation_date": "+262142-12-31"
    });
    let resp = test::call_service(
        &app,
        request(Method::POST, "/wizard").set_json(&form).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let started: Value = test::read_body_json(resp).await;
    let session = started["session"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        in_session(request(Method::GET, "/wizard/bundle"), &session).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["bundle"]["resignation_date"].is_string());
    assert!(body["bundle"].get("relieving_date").is_none());
}

#[actix_web::test]
async fn back_to_back_letters_get_their_own_files() {
    let harness = Harness::new(&[]);
    let app = app!(harness);

    let mut documents = Vec::new();
    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            request(Method::POST, "/wizard").set_json(increment_form()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let started: Value = test::read_body_json(resp).await;
        let session = started["session"].as_str().unwrap().to_string();

        let resp = test::call_service(
            &app,
            in_session(request(Method::POST, "/wizard/generate"), &session).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let outcome: Value = test::read_body_json(resp).await;
        documents.push(outcome["documents"][0].clone());
    }

    assert_ne!(documents[0]["filename"], documents[1]["filename"]);
    for document in &documents {
        let path = document["file_path"].as_str().unwrap();
        assert!(std::path::Path::new(path).exists(), "{path} is missing");
    }
    let first = std::fs::read_to_string(documents[0]["file_path"].as_str().unwrap()).unwrap();
    assert!(first.contains("660000"));
}
