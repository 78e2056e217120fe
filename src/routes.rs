//! REST endpoints for driving the portal workflow.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::bridge::AppSeed;
use crate::error::Error;
use crate::manager::PortalManager;
use crate::navigator::{ChildForm, CreateAccountForm, SignInForm};
use crate::payment::PaymentForm;

/// Shared state for portal routes.
#[derive(Clone)]
pub struct PortalRouteState {
    pub manager: Arc<PortalManager>,
}

fn error_response(err: Error) -> Response {
    match err {
        Error::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "errors": errors.fields })),
        )
            .into_response(),
        Error::Capacity(err) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
        Error::Consistency(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn get_status(State(state): State<PortalRouteState>) -> impl IntoResponse {
    Json(state.manager.status().await)
}

async fn get_summary(State(state): State<PortalRouteState>) -> impl IntoResponse {
    Json(state.manager.summary().await)
}

async fn bootstrap(
    State(state): State<PortalRouteState>,
    Json(seed): Json<AppSeed>,
) -> impl IntoResponse {
    state.manager.bootstrap(Some(seed)).await;
    StatusCode::NO_CONTENT
}

async fn sign_in(
    State(state): State<PortalRouteState>,
    Json(form): Json<SignInForm>,
) -> Response {
    match state.manager.sign_in(form).await {
        Ok(step) => Json(serde_json::json!({ "step": step })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_account(
    State(state): State<PortalRouteState>,
    Json(form): Json<CreateAccountForm>,
) -> Response {
    match state.manager.create_account(form).await {
        Ok(step) => Json(serde_json::json!({ "step": step })).into_response(),
        Err(err) => error_response(err),
    }
}

/// Drive the simulated verification round-trip to completion.
async fn verify_email(State(state): State<PortalRouteState>) -> Response {
    if let Err(err) = state.manager.begin_verification().await {
        return error_response(err);
    }
    match state.manager.complete_verification().await {
        Ok(step) => Json(serde_json::json!({ "step": step })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn advance(State(state): State<PortalRouteState>) -> Response {
    match state.manager.advance().await {
        Ok(step) => Json(serde_json::json!({ "step": step })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn back(State(state): State<PortalRouteState>) -> Response {
    let action = state.manager.retreat().await;
    Json(serde_json::json!({ "action": action })).into_response()
}

async fn submit_payment(
    State(state): State<PortalRouteState>,
    Json(form): Json<PaymentForm>,
) -> Response {
    match state.manager.submit_payment(form).await {
        Ok(outcome) => Json(serde_json::json!({ "outcome": outcome })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn continue_without_renewal(State(state): State<PortalRouteState>) -> Response {
    match state.manager.continue_without_auto_renew().await {
        Ok(step) => Json(serde_json::json!({ "step": step })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct BindingRequest {
    confirmed: bool,
}

async fn confirm_binding(
    State(state): State<PortalRouteState>,
    Json(req): Json<BindingRequest>,
) -> Response {
    match state.manager.confirm_binding(req.confirmed).await {
        Ok(step) => Json(serde_json::json!({ "step": step })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn open_consent(State(state): State<PortalRouteState>) -> impl IntoResponse {
    state.manager.open_consent().await;
    StatusCode::NO_CONTENT
}

async fn close_consent(State(state): State<PortalRouteState>) -> impl IntoResponse {
    state.manager.close_consent().await;
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct ConsentRequest {
    dob: String,
    agree_to_terms: bool,
}

async fn confirm_consent(
    State(state): State<PortalRouteState>,
    Json(req): Json<ConsentRequest>,
) -> Response {
    match state
        .manager
        .confirm_consent(&req.dob, req.agree_to_terms)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct InviteRequest {
    email: String,
    birthday: String,
}

async fn invite_player(
    State(state): State<PortalRouteState>,
    Json(req): Json<InviteRequest>,
) -> Response {
    match state.manager.invite_player(&req.email, &req.birthday).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn cancel_invite(
    State(state): State<PortalRouteState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    state.manager.cancel_invite(index).await;
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct OwnerRequest {
    added: bool,
}

async fn set_owner(
    State(state): State<PortalRouteState>,
    Json(req): Json<OwnerRequest>,
) -> impl IntoResponse {
    state.manager.set_owner_added(req.added).await;
    StatusCode::NO_CONTENT
}

async fn attach_child(
    State(state): State<PortalRouteState>,
    Json(form): Json<ChildForm>,
) -> Response {
    match state.manager.attach_child(form).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn return_to_app(State(state): State<PortalRouteState>) -> Response {
    match state.manager.return_to_app().await {
        Ok(signal) => Json(signal).into_response(),
        Err(err) => error_response(err),
    }
}

/// Build the portal REST routes.
pub fn portal_routes(state: PortalRouteState) -> Router {
    Router::new()
        .route("/api/portal/status", get(get_status))
        .route("/api/portal/summary", get(get_summary))
        .route("/api/portal/bootstrap", post(bootstrap))
        .route("/api/portal/sign-in", post(sign_in))
        .route("/api/portal/create-account", post(create_account))
        .route("/api/portal/verify", post(verify_email))
        .route("/api/portal/advance", post(advance))
        .route("/api/portal/back", post(back))
        .route("/api/portal/payment", post(submit_payment))
        .route(
            "/api/portal/payment/continue-without-renewal",
            post(continue_without_renewal),
        )
        .route("/api/portal/binding", post(confirm_binding))
        .route("/api/portal/consent/open", post(open_consent))
        .route("/api/portal/consent/close", post(close_consent))
        .route("/api/portal/consent/confirm", post(confirm_consent))
        .route("/api/portal/invites", post(invite_player))
        .route("/api/portal/invites/{index}/cancel", post(cancel_invite))
        .route("/api/portal/owner", post(set_owner))
        .route("/api/portal/child", post(attach_child))
        .route("/api/portal/return", post(return_to_app))
        .with_state(state)
}
