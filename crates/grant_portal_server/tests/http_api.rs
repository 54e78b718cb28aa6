//! HTTP-level contract tests for the grant portal server.
//!
//! Runs the full router over the in-memory store and blob store; no
//! database needed.

use std::sync::Arc;

use axum::body::Body;
use grant_portal_core::blob_store::InMemoryBlobStore;
use grant_portal_core::memory::MemoryStore;
use grant_portal_core::users::InMemoryRoleDirectory;
use grant_portal_core::{PortalPolicy, PortalService};
use grant_portal_server::router::build_router;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Test app builder ───────────────────────────────────────────

fn build_test_app() -> axum::Router {
    let service = Arc::new(PortalService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(InMemoryBlobStore::default()),
        Arc::new(InMemoryRoleDirectory::new()),
        PortalPolicy::default(),
    ));
    build_router(service)
}

struct Caller {
    id: &'static str,
    email: &'static str,
    roles: &'static str,
}

const ADMIN: Caller = Caller {
    id: "admin-1",
    email: "admin@example.org",
    roles: "admin",
};
const APPLICANT: Caller = Caller {
    id: "applicant-1",
    email: "pi@example.org",
    roles: "applicant",
};
const PRIMARY: Caller = Caller {
    id: "reviewer-1",
    email: "first@example.org",
    roles: "reviewer",
};
const SECONDARY: Caller = Caller {
    id: "reviewer-2",
    email: "second@example.org",
    roles: "reviewer",
};

fn request(method: &str, uri: &str, caller: Option<&Caller>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(c) = caller {
        builder = builder
            .header("x-user-id", c.id)
            .header("x-user-email", c.email)
            .header("x-user-roles", c.roles);
    }
    match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(request(method, uri, caller, body))
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

// ── Helper to read response body ───────────────────────────────

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

fn proposal() -> Value {
    json!({
        "grant_type": "research",
        "title": "Tumour microenvironment atlas",
        "answers": { "institution": "Example University" },
        "file_name": "proposal.pdf",
        "file_base64": "data:application/pdf;base64,JVBERi0xLjQ=",
    })
}

async fn open_cycle(app: &axum::Router) {
    let (status, body) = send(
        app,
        "POST",
        "/cycles/rollover",
        Some(&ADMIN),
        Some(json!({ "name": "2025" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

async fn set_stage(app: &axum::Router, stage: &str) -> (StatusCode, Value) {
    send(
        app,
        "PUT",
        "/cycles/current/stage",
        Some(&ADMIN),
        Some(json!({ "stage": stage })),
    )
    .await
}

async fn onboard_reviewer(app: &axum::Router, caller: &Caller) {
    let (status, _) = send(
        app,
        "POST",
        "/whitelist",
        Some(&ADMIN),
        Some(json!({
            "email": caller.email,
            "first_name": "Rev",
            "last_name": caller.id,
            "affiliation": "Example Institute",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(
        app,
        "POST",
        "/accounts/reviewer",
        Some(caller),
        Some(json!({ "first_name": "Rev", "last_name": caller.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

// ── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn health_needs_no_identity() {
    let app = build_test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_identity_headers() {
    let app = build_test_app();
    let (status, body) = send(&app, "GET", "/cycles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("x-user-id"));
}

#[tokio::test]
async fn unknown_role_header_is_rejected() {
    let app = build_test_app();
    let caller = Caller {
        id: "u1",
        email: "u1@example.org",
        roles: "superuser",
    };
    let (status, _) = send(&app, "GET", "/cycles", Some(&caller), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn no_current_cycle_is_service_unavailable() {
    let app = build_test_app();
    let (status, body) = send(&app, "GET", "/cycles/current", Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn non_admin_cannot_change_stage() {
    let app = build_test_app();
    open_cycle(&app).await;
    let (status, _) = send(
        &app,
        "PUT",
        "/cycles/current/stage",
        Some(&APPLICANT),
        Some(json!({ "stage": "Review" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stage_cannot_move_backwards_by_default() {
    let app = build_test_app();
    open_cycle(&app).await;
    let (status, body) = set_stage(&app, "Review").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "Review");

    let (status, _) = set_stage(&app, "Applications Open").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn submission_closed_outside_open_stage() {
    let app = build_test_app();
    open_cycle(&app).await;
    set_stage(&app, "Applications Closed").await;
    let (status, _) = send(&app, "POST", "/applications", Some(&APPLICANT), Some(proposal())).await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn malformed_upload_is_bad_request() {
    let app = build_test_app();
    open_cycle(&app).await;
    let mut body = proposal();
    body["file_base64"] = json!("not base64 at all!");
    let (status, _) = send(&app, "POST", "/applications", Some(&APPLICANT), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reviewer_registration_requires_whitelist() {
    let app = build_test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/accounts/reviewer",
        Some(&PRIMARY),
        Some(json!({ "first_name": "Rev", "last_name": "One" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn faqs_are_public_but_editing_is_admin_only() {
    let app = build_test_app();
    let (status, _) = send(
        &app,
        "PUT",
        "/faqs",
        Some(&APPLICANT),
        Some(json!({ "question": "When?", "answer": "Soon" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(
        &app,
        "PUT",
        "/faqs",
        Some(&ADMIN),
        Some(json!({ "question": "When?", "answer": "Soon" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = send(&app, "GET", "/faqs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let uri = format!("/faqs/{}", created["faq_id"].as_str().unwrap());
    let (status, _) = send(&app, "DELETE", &uri, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn negative_award_is_rejected() {
    let app = build_test_app();
    open_cycle(&app).await;
    let (_, app_body) = send(&app, "POST", "/applications", Some(&APPLICANT), Some(proposal())).await;
    let uri = format!(
        "/applications/{}/decision",
        app_body["application_id"].as_str().unwrap()
    );
    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(&ADMIN),
        Some(json!({ "funding_amount": "-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", &uri, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}

#[tokio::test]
async fn full_cycle_from_submission_to_report() {
    let app = build_test_app();
    open_cycle(&app).await;

    // Applicant submits
    let (status, submitted) =
        send(&app, "POST", "/applications", Some(&APPLICANT), Some(proposal())).await;
    assert_eq!(status, StatusCode::CREATED, "{submitted}");
    let app_id = submitted["application_id"].as_str().unwrap().to_string();
    assert_eq!(submitted["decision"], "pending");

    let (_, mine) = send(&app, "GET", "/applications/mine", Some(&APPLICANT), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    // Reviewers onboard and get assigned
    onboard_reviewer(&app, &PRIMARY).await;
    onboard_reviewer(&app, &SECONDARY).await;
    let (status, created) = send(
        &app,
        "POST",
        &format!("/applications/{app_id}/reviewers"),
        Some(&ADMIN),
        Some(json!({ "primary": PRIMARY.id, "secondary": SECONDARY.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let reviews = created.as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    let review_of = |who: &str| {
        reviews
            .iter()
            .find(|r| r["reviewer_id"] == who)
            .map(|r| r["review_id"].as_str().unwrap().to_string())
            .unwrap()
    };
    let primary_review = review_of(PRIMARY.id);
    let secondary_review = review_of(SECONDARY.id);

    // Same reviewer cannot be added again in the other slot
    let (status, _) = send(
        &app,
        "POST",
        &format!("/applications/{app_id}/reviewers"),
        Some(&ADMIN),
        Some(json!({ "secondary": PRIMARY.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Reviews are locked until the Review stage
    let save_uri = format!("/applications/{app_id}/reviews/{primary_review}");
    let (status, _) = send(
        &app,
        "PUT",
        &save_uri,
        Some(&PRIMARY),
        Some(json!({ "feedback": { "summary": "draft" } })),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = set_stage(&app, "Review").await;
    assert_eq!(status, StatusCode::OK);

    let (status, saved) = send(
        &app,
        "PUT",
        &save_uri,
        Some(&PRIMARY),
        Some(json!({ "feedback": { "summary": "draft" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["status"], "in-progress");

    // Another reviewer cannot touch this review
    let (status, _) = send(&app, "PUT", &save_uri, Some(&SECONDARY), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &format!("{save_uri}/submit"),
        Some(&PRIMARY),
        Some(json!({ "feedback": { "summary": "no score" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, done) = send(
        &app,
        "POST",
        &format!("{save_uri}/submit"),
        Some(&PRIMARY),
        Some(json!({
            "score": 2,
            "feedback": { "summary": "Strong", "internal": "admin eyes only" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");

    let (_, summary) = send(
        &app,
        "GET",
        &format!("/applications/{app_id}/reviews"),
        Some(&ADMIN),
        None,
    )
    .await;
    assert_eq!(summary["status"], "in-progress");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/applications/{app_id}/reviews/{secondary_review}/submit"),
        Some(&SECONDARY),
        Some(json!({ "score": 3, "feedback": { "summary": "Fine" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, summary) = send(
        &app,
        "GET",
        &format!("/applications/{app_id}/reviews"),
        Some(&ADMIN),
        None,
    )
    .await;
    assert_eq!(summary["status"], "completed");

    // Completed reviews cannot be unassigned
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/applications/{app_id}/reviewers/{primary_review}"),
        Some(&ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Award
    let (status, decision) = send(
        &app,
        "PUT",
        &format!("/applications/{app_id}/decision"),
        Some(&ADMIN),
        Some(json!({ "funding_amount": "50000", "comments": "Congratulations" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{decision}");
    assert_eq!(decision["is_accepted"], true);

    let (_, fetched) = send(
        &app,
        "GET",
        &format!("/applications/{app_id}"),
        Some(&APPLICANT),
        None,
    )
    .await;
    assert_eq!(fetched["decision"], "accepted");

    // Results are hidden until Final Decisions
    let (status, _) = send(&app, "GET", "/results/mine", Some(&APPLICANT), None).await;
    assert_eq!(status, StatusCode::LOCKED);

    set_stage(&app, "Final Decisions").await;
    let (status, results) = send(&app, "GET", "/results/mine", Some(&APPLICANT), None).await;
    assert_eq!(status, StatusCode::OK);
    let result = &results.as_array().unwrap()[0];
    assert_eq!(result["comments"], "Congratulations");
    let feedback = result["feedback"].as_array().unwrap();
    assert_eq!(feedback.len(), 2);
    assert!(feedback.iter().all(|f| f.get("internal").is_none()));

    // Post-grant report
    let report_uri = format!("/applications/{app_id}/report");
    let (_, view) = send(&app, "GET", &report_uri, Some(&APPLICANT), None).await;
    assert_eq!(view["status"], "pending");
    assert!(view["report"].is_null());

    let report = json!({
        "investigator_name": "Dr. Pat Example",
        "institution_name": "Example University",
        "attestation_date": "2025-06-30",
        "file_name": "report.pdf",
        "file_base64": "JVBERi0xLjQ=",
    });
    let (status, body) = send(&app, "POST", &report_uri, Some(&APPLICANT), Some(report.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, _) = send(&app, "POST", &report_uri, Some(&APPLICANT), Some(report)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, view) = send(&app, "GET", &report_uri, Some(&APPLICANT), None).await;
    assert_eq!(view["status"], "submitted");

    let (status, rows) = send(&app, "GET", "/reports?status=submitted", Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    let (_, rows) = send(&app, "GET", "/reports?status=overdue", Some(&ADMIN), None).await;
    assert!(rows.as_array().unwrap().is_empty());
}
