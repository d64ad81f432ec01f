use axum::{Json, extract::State, http::StatusCode};
use rollbook_core::AppError;
use rollbook_models::{LoginRequest, LoginResponse, RegisterRequest, User};
use tracing::instrument;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::AuthService;

/// Body of every error response.
#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Exchange email and password for an access token
#[utoipa::path(
    post,
    path = "/api/auth/token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn obtain_token(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthService::login(&state.db, &state.jwt_config, dto).await?;
    Ok(Json(response))
}

/// Register an account with a teacher or student PIN
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and PIN consumed", body = User),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 404, description = "PIN not found", body = ErrorResponse),
        (status = 409, description = "PIN already used or email taken", body = ErrorResponse),
        (status = 410, description = "PIN expired", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn register_with_pin(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = AuthService::register_with_pin(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
