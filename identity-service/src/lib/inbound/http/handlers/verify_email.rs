use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SuccessResponseData;
use crate::account::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

/// Verify from a JSON body, as sent by a client application.
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<ApiSuccess<SuccessResponseData>, ApiError> {
    consume(&state, &body.token).await
}

/// Verify from the link delivered by email.
pub async fn verify_email_link(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailRequest>,
) -> Result<ApiSuccess<SuccessResponseData>, ApiError> {
    consume(&state, &query.token).await
}

async fn consume(
    state: &AppState,
    token: &str,
) -> Result<ApiSuccess<SuccessResponseData>, ApiError> {
    state
        .auth_service
        .verify_email(token)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, SuccessResponseData::ok()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyEmailRequest {
    token: String,
}
