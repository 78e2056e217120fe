//! End-to-end workflow tests: the full onboarding path from app seed to
//! return-to-app, plus the REST surface.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use portal_flow::bridge::AppSeed;
use portal_flow::config::PortalConfig;
use portal_flow::error::Error;
use portal_flow::manager::PortalManager;
use portal_flow::navigator::{CreateAccountForm, NavAction, SignInForm};
use portal_flow::payment::{PaymentForm, PaymentOutcome};
use portal_flow::routes::{portal_routes, PortalRouteState};
use portal_flow::steps::Step;
use portal_flow::verify::InstantVerification;

fn manager() -> PortalManager {
    PortalManager::new(PortalConfig::default(), Arc::new(InstantVerification))
}

fn seed() -> AppSeed {
    AppSeed {
        device_id: "DV-2024-0042".to_string(),
        device_name: "MLMDS".to_string(),
        child_name: "John Doe".to_string(),
        child_age: 12,
    }
}

fn sign_in_form() -> SignInForm {
    SignInForm {
        email: "parent@example.com".to_string(),
        password: "secret1".to_string(),
    }
}

fn payment_form() -> PaymentForm {
    PaymentForm {
        card_number: "4111 1111 1111 1111".to_string(),
        card_name: "Pat Example".to_string(),
        expiry_date: "09/27".to_string(),
        cvc: "123".to_string(),
        auto_renew: true,
    }
}

#[tokio::test]
async fn full_flow_from_app_to_return_signal() {
    let m = manager();
    m.bootstrap(Some(seed())).await;

    // Sign-in bypasses verification and lands on Payment.
    let step = m.sign_in(sign_in_form()).await.unwrap();
    assert_eq!(step, Step::Payment);

    let outcome = m.submit_payment(payment_form()).await.unwrap();
    assert_eq!(outcome, PaymentOutcome::Accepted);
    assert_eq!(m.status().await.step, Step::DeviceAssignment);

    // Binding needs the confirmation checkbox.
    assert!(m.confirm_binding(false).await.is_err());
    let step = m.confirm_binding(true).await.unwrap();
    assert_eq!(step, Step::AccessRequest);
    assert!(m.status().await.session.device.is_bound);

    // Consent: scripted mismatch first, approval second.
    m.open_consent().await;
    assert!(m.confirm_consent("2012-06-15", true).await.is_err());
    m.confirm_consent("2012-06-15", true).await.unwrap();

    // Fill the remaining slots.
    m.set_owner_added(true).await;
    m.invite_player("friend@example.com", "2010-03-04")
        .await
        .unwrap();
    let status = m.status().await;
    assert_eq!(status.total_players, 3);
    assert!(!status.can_add_more);

    let step = m.advance().await.unwrap();
    assert_eq!(step, Step::Complete);

    let summary = m.summary().await;
    assert!(summary.device.is_bound);
    assert_eq!(summary.associated_users.len(), 3);

    let signal = m.return_to_app().await.unwrap();
    assert_eq!(signal.scheme, "rapsodo://");
}

#[tokio::test]
async fn create_account_path_verifies_then_skips_one_net_step() {
    let m = manager();
    let step = m
        .create_account(CreateAccountForm {
            email: "new@example.com".to_string(),
            password: "secret12".to_string(),
            confirm_password: "secret12".to_string(),
            first_name: "New".to_string(),
            last_name: "Parent".to_string(),
        })
        .await
        .unwrap();
    // Unverified account re-enters step 1's verification sub-state.
    assert_eq!(step, Step::Account);
    let status = m.status().await;
    assert!(!status.session.user.as_ref().unwrap().has_verified_email);

    m.begin_verification().await.unwrap();
    let step = m.complete_verification().await.unwrap();
    assert_eq!(step, Some(Step::DeviceAssignment));
}

#[tokio::test]
async fn device_binding_is_monotonic_across_later_actions() {
    let m = manager();
    m.sign_in(sign_in_form()).await.unwrap();
    m.submit_payment(payment_form()).await.unwrap();
    m.confirm_binding(true).await.unwrap();
    assert!(m.status().await.session.device.is_bound);

    // Navigate backward and forward, mutate the ledger — the flag stays.
    m.retreat().await;
    m.retreat().await;
    m.advance().await.unwrap();
    m.set_owner_added(true).await;
    m.invite_player("p@example.com", "2011-01-01").await.unwrap();
    m.cancel_invite(0).await;
    assert!(m.status().await.session.device.is_bound);
}

#[tokio::test]
async fn slot_cap_refuses_fourth_player() {
    let m = manager();
    m.open_consent().await;
    let _ = m.confirm_consent("2012-06-15", true).await;
    m.confirm_consent("2012-06-15", true).await.unwrap();
    m.set_owner_added(true).await;
    m.invite_player("one@example.com", "2010-01-01").await.unwrap();

    let err = m
        .invite_player("two@example.com", "2010-01-01")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Capacity(_)));
    assert_eq!(m.status().await.invitees.len(), 1);
}

#[tokio::test]
async fn retreat_floor_exits_to_landing() {
    let m = manager();
    assert_eq!(m.retreat().await, NavAction::ExitToLanding);
    assert_eq!(m.status().await.session.current_step, 1);
}

#[tokio::test]
async fn failed_validation_leaves_session_untouched() {
    let m = manager();
    m.sign_in(sign_in_form()).await.unwrap();
    let before = m.status().await.session;

    let err = m.submit_payment(PaymentForm::default()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(m.status().await.session, before);
}

// ── REST surface ─────────────────────────────────────────────────────────

fn app() -> axum::Router {
    portal_routes(PortalRouteState {
        manager: Arc::new(manager()),
    })
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn status_endpoint_reports_fresh_session() {
    let app = app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/portal/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["step"], "account");
    assert_eq!(status["session"]["current_step"], 1);
    assert_eq!(status["max_players"], 3);
}

#[tokio::test]
async fn sign_in_endpoint_validates_and_advances() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/portal/sign-in",
            serde_json::json!({ "email": "", "password": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body_json(response).await;
    assert_eq!(errors["errors"]["email"], "Email is required");

    let response = app
        .oneshot(post_json(
            "/api/portal/sign-in",
            serde_json::json!({ "email": "a@b.com", "password": "secret1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["step"], "payment");
}

#[tokio::test]
async fn capacity_maps_to_conflict() {
    let app = app();
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/portal/invites",
                serde_json::json!({ "email": email, "birthday": "2010-01-01" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = app
        .oneshot(post_json(
            "/api/portal/invites",
            serde_json::json!({ "email": "d@x.com", "birthday": "2010-01-01" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn consistency_maps_to_server_error() {
    let app = app();
    // Advancing with no user is a contract violation, not user error.
    let response = app
        .oneshot(post_json("/api/portal/advance", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
