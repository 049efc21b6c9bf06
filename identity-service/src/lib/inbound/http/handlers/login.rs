use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::TokenPairResponseData;
use crate::account::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

/// Exchange credentials for a token pair.
///
/// The password policy is not applied here: accounts keep working whatever
/// policy was in force when their password was chosen.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<TokenPairResponseData>, ApiError> {
    state
        .auth_service
        .login(body.email.trim(), &body.password)
        .await
        .map_err(ApiError::from)
        .map(|pair| ApiSuccess::new(StatusCode::OK, pair.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    email: String,
    password: String,
}
